//! Kiosk pickup controller
//!
//! Coordinates the café counter's pickup workflow against the venue hub:
//! stage paid orders into the delivery robot's doored compartments (max 3),
//! open doors when the robot is parked at the staging point, and commit DONE
//! statuses after batch dispatch.
//!
//! # Workflow
//!
//! ```text
//! mark_as_done(order)
//!     ├─ 1. Validate: table present, not staged, capacity < 3
//!     ├─ 2. Stage entry, send table READY + ORDER_READY
//!     ├─ 3. Robot already at staging point? open door now
//!     └─ 4. Otherwise the position watcher opens it on a later tick
//!
//! dispatch_all()
//!     ├─ 1. Close every staged door (best effort)
//!     ├─ 2. Send one aggregate dispatch command
//!     ├─ 3. Commit DONE per order, sequentially, abort-and-preserve
//!     └─ 4. Refresh the order board and clear the staged set
//! ```

pub mod board;
pub mod center;
pub mod config;
pub mod dispatch;
pub mod doors;
pub mod logger;
pub mod notify;
pub mod staging;
pub mod watcher;

pub use board::OrderBoard;
pub use center::PickupCenter;
pub use config::Config;
pub use dispatch::{DispatchError, Dispatcher};
pub use doors::{DoorPolicy, IdentityDoors};
pub use notify::{LogNotifier, Notifier};
pub use staging::{PickupStaging, StageError, StageState, StagedEntry};
pub use watcher::{PositionWatcher, StagingPointListener};
