//! # meshferry-import
//!
//! Reconciles an FBX import against the editor's content workspace:
//! sweeps leftover staging folders, decides between fresh import and
//! reimport, works around the host's auto-renaming by importing through a
//! staging folder, and applies post-import settings.
//!
//! All editor operations go through the [`Workspace`] capability trait.
//! [`RemoteWorkspace`] implements it over a command session;
//! `InMemoryWorkspace` (feature `test-support`) models the host for tests.

pub mod command;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod reconciler;
pub mod remote;
pub mod workspace;

pub use command::{ImportCommand, ImportOptions};
pub use error::{ReconcileError, ReconcileStep, WorkspaceError};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{InMemoryWorkspace, SuffixQuirk};
pub use reconciler::{ImportDecision, ImportReconciler, ReconcileReport};
pub use remote::{RemoteWorkspace, RemoteWorkspaceConnector, WorkspaceOp};
pub use workspace::{
    AssetClass, AssetInfo, CollisionMode, Workspace, WorkspaceConnector, WorkspaceSession,
};
