//! Task-batch scheduling of kernel dispatches on the CPU pool.
//!
//! A dispatch is decomposed in three steps: the global size is cut into
//! work-groups ([`grid`]), work-groups are coalesced into batches that
//! workers claim from a shared cursor ([`batch`]), and each worker runs its
//! groups phase by phase so barriers hold ([`group`]). [`dispatch`] fans the
//! worker tasks out to the pool and joins them.

pub mod batch;
pub mod dispatch;
pub(crate) mod group;
pub mod grid;

pub use batch::BatchPlan;
pub use dispatch::{dispatch_scope, DispatchScope};
pub use grid::{work_group_shape, WorkGroupGrid};
