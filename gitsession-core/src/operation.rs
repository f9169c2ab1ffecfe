//! Operation taxonomy.
//!
//! Every request against a working copy is tagged with an [`OperationKind`].
//! The predicates below are exhaustive matches with no fallback arm: adding a
//! variant does not compile until it has been classified everywhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    IntoStaticStr,
)]
pub enum OperationKind {
    Add,
    Apply,
    Blame,
    Branch,
    CheckIgnore,
    Checkout,
    CheckoutTracking,
    CherryPick,
    Clean,
    Commit,
    Config,
    DeleteBranch,
    DeleteRef,
    DeleteTag,
    Diff,
    Fetch,
    FetchAll,
    FetchDefault,
    FetchPrune,
    FindTrackingBranches,
    GetBranch,
    GetBranches,
    GetCommitTemplate,
    GetObjectDetails,
    GetStashes,
    HashObject,
    Ignore,
    Log,
    LogFile,
    Merge,
    MergeBase,
    Move,
    Pull,
    Push,
    Rebase,
    RebaseAbort,
    RebaseContinue,
    Remote,
    Remove,
    RenameBranch,
    Reset,
    RevertFiles,
    SetBranchUpstream,
    Show,
    Stage,
    StashApply,
    StashDrop,
    StashPop,
    StashPush,
    Status,
    SubmoduleUpdate,
    Sync,
    Tag,
}

impl OperationKind {
    /// Every variant, in declaration order.
    pub fn iter() -> impl Iterator<Item = OperationKind> {
        <OperationKind as strum::IntoEnumIterator>::iter()
    }

    /// `true` when the operation cannot change the working copy, the index, or refs.
    ///
    /// `Status` is deliberately not read-only: it is the operation that
    /// rewrites the in-memory model.
    pub fn is_read_only(self) -> bool {
        match self {
            OperationKind::Blame
            | OperationKind::CheckIgnore
            | OperationKind::Diff
            | OperationKind::FindTrackingBranches
            | OperationKind::GetBranch
            | OperationKind::GetBranches
            | OperationKind::GetCommitTemplate
            | OperationKind::GetObjectDetails
            | OperationKind::GetStashes
            | OperationKind::Log
            | OperationKind::LogFile
            | OperationKind::MergeBase
            | OperationKind::Show => true,
            OperationKind::Add
            | OperationKind::Apply
            | OperationKind::Branch
            | OperationKind::Checkout
            | OperationKind::CheckoutTracking
            | OperationKind::CherryPick
            | OperationKind::Clean
            | OperationKind::Commit
            | OperationKind::Config
            | OperationKind::DeleteBranch
            | OperationKind::DeleteRef
            | OperationKind::DeleteTag
            | OperationKind::Fetch
            | OperationKind::FetchAll
            | OperationKind::FetchDefault
            | OperationKind::FetchPrune
            | OperationKind::HashObject
            | OperationKind::Ignore
            | OperationKind::Merge
            | OperationKind::Move
            | OperationKind::Pull
            | OperationKind::Push
            | OperationKind::Rebase
            | OperationKind::RebaseAbort
            | OperationKind::RebaseContinue
            | OperationKind::Remote
            | OperationKind::Remove
            | OperationKind::RenameBranch
            | OperationKind::Reset
            | OperationKind::RevertFiles
            | OperationKind::SetBranchUpstream
            | OperationKind::Stage
            | OperationKind::StashApply
            | OperationKind::StashDrop
            | OperationKind::StashPop
            | OperationKind::StashPush
            | OperationKind::Status
            | OperationKind::SubmoduleUpdate
            | OperationKind::Sync
            | OperationKind::Tag => false,
        }
    }

    /// `true` when a running instance should surface a progress indicator.
    pub fn shows_progress(self) -> bool {
        match self {
            OperationKind::Fetch
            | OperationKind::FetchAll
            | OperationKind::FetchDefault
            | OperationKind::FetchPrune
            | OperationKind::CheckIgnore
            | OperationKind::GetObjectDetails
            | OperationKind::Show => false,
            OperationKind::Add
            | OperationKind::Apply
            | OperationKind::Blame
            | OperationKind::Branch
            | OperationKind::Checkout
            | OperationKind::CheckoutTracking
            | OperationKind::CherryPick
            | OperationKind::Clean
            | OperationKind::Commit
            | OperationKind::Config
            | OperationKind::DeleteBranch
            | OperationKind::DeleteRef
            | OperationKind::DeleteTag
            | OperationKind::Diff
            | OperationKind::FindTrackingBranches
            | OperationKind::GetBranch
            | OperationKind::GetBranches
            | OperationKind::GetCommitTemplate
            | OperationKind::GetStashes
            | OperationKind::HashObject
            | OperationKind::Ignore
            | OperationKind::Log
            | OperationKind::LogFile
            | OperationKind::Merge
            | OperationKind::MergeBase
            | OperationKind::Move
            | OperationKind::Pull
            | OperationKind::Push
            | OperationKind::Rebase
            | OperationKind::RebaseAbort
            | OperationKind::RebaseContinue
            | OperationKind::Remote
            | OperationKind::Remove
            | OperationKind::RenameBranch
            | OperationKind::Reset
            | OperationKind::RevertFiles
            | OperationKind::SetBranchUpstream
            | OperationKind::Stage
            | OperationKind::StashApply
            | OperationKind::StashDrop
            | OperationKind::StashPop
            | OperationKind::StashPush
            | OperationKind::Status
            | OperationKind::SubmoduleUpdate
            | OperationKind::Sync
            | OperationKind::Tag => true,
        }
    }

    /// `true` when at most one invocation of this kind may run per session.
    pub fn is_serialized(self) -> bool {
        match self {
            OperationKind::Status
            | OperationKind::Fetch
            | OperationKind::FetchAll
            | OperationKind::FetchDefault
            | OperationKind::FetchPrune
            | OperationKind::StashApply
            | OperationKind::StashPop
            | OperationKind::Sync => true,
            OperationKind::Add
            | OperationKind::Apply
            | OperationKind::Blame
            | OperationKind::Branch
            | OperationKind::CheckIgnore
            | OperationKind::Checkout
            | OperationKind::CheckoutTracking
            | OperationKind::CherryPick
            | OperationKind::Clean
            | OperationKind::Commit
            | OperationKind::Config
            | OperationKind::DeleteBranch
            | OperationKind::DeleteRef
            | OperationKind::DeleteTag
            | OperationKind::Diff
            | OperationKind::FindTrackingBranches
            | OperationKind::GetBranch
            | OperationKind::GetBranches
            | OperationKind::GetCommitTemplate
            | OperationKind::GetObjectDetails
            | OperationKind::GetStashes
            | OperationKind::HashObject
            | OperationKind::Ignore
            | OperationKind::Log
            | OperationKind::LogFile
            | OperationKind::Merge
            | OperationKind::MergeBase
            | OperationKind::Move
            | OperationKind::Pull
            | OperationKind::Push
            | OperationKind::Rebase
            | OperationKind::RebaseAbort
            | OperationKind::RebaseContinue
            | OperationKind::Remote
            | OperationKind::Remove
            | OperationKind::RenameBranch
            | OperationKind::Reset
            | OperationKind::RevertFiles
            | OperationKind::SetBranchUpstream
            | OperationKind::Show
            | OperationKind::Stage
            | OperationKind::StashDrop
            | OperationKind::StashPush
            | OperationKind::SubmoduleUpdate
            | OperationKind::Tag => false,
        }
    }

    /// Network verbs: the fetch family, pull, push and sync.
    pub fn is_remote(self) -> bool {
        matches!(
            self,
            OperationKind::Fetch
                | OperationKind::FetchAll
                | OperationKind::FetchDefault
                | OperationKind::FetchPrune
                | OperationKind::Pull
                | OperationKind::Push
                | OperationKind::Sync
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
