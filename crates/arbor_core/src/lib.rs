//! Arbor Core
//!
//! Foundational types shared by every Arbor crate:
//!
//! - [`errors`]: the [`ArborError`] taxonomy and [`Result`] alias
//! - [`id`]: stable [`ObjectId`]s
//! - [`version`]: [`ChangeTracker`] dirty counters
//! - [`signal`]: the [`Signal`] reactive cell
//! - [`channel`]: [`ResourceChannel`] producer/consumer hand-off
//! - [`invalidate`]: the demand-redraw [`Invalidator`]
//!
//! Everything here is single-threaded (`Rc`/`Cell`): the scene bridge runs
//! on one logical thread in frame order.

pub mod channel;
pub mod errors;
pub mod id;
pub mod invalidate;
pub mod signal;
pub mod version;

pub use channel::{ChannelProducer, ResourceChannel};
pub use errors::{ArborError, Result};
pub use id::ObjectId;
pub use invalidate::Invalidator;
pub use signal::{Signal, Subscription, WeakSignal};
pub use version::{ChangeTracker, MutGuard};
