//! # surfacer-core
//!
//! Helpers for automated UI tests that have to deal with the screen as it
//! actually is: content that is scrolled out of view, chrome that covers part
//! of a scroll view, and system alerts that pop up at unpredictable moments.
//!
//! ## Modules
//!
//! - [`geometry`] - Rectangles, points and vectors in screen points
//! - [`element`] - Accessibility hierarchy types
//! - [`driver`] - The [`AutomationDriver`](driver::AutomationDriver) trait, selectors and live element handles
//! - [`obstruction`] - Navigation bar, keyboard and custom obstructions, and the area they leave
//! - [`scroll`] - Scroll-to-reveal search
//! - [`alert`] - System alert classification and handling
//! - [`snapshot`] - In-memory driver over a captured hierarchy
//! - [`config`] - Persistent tuning defaults
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use surfacer_core::alert::{AlertHandler, ButtonRole};
//! use surfacer_core::driver::Selector;
//! use surfacer_core::obstruction::Obstruction;
//! use surfacer_core::scroll::ScrollSearch;
//! use surfacer_core::snapshot::SnapshotDriver;
//!
//! #[tokio::main]
//! async fn main() {
//!     let driver = Arc::new(SnapshotDriver::from_file("screen.json").expect("bad snapshot"));
//!
//!     // Answer a permission prompt if one is showing.
//!     let alerts = AlertHandler::new(driver.clone());
//!     if alerts.current().await.unwrap().is_some() {
//!         alerts.respond(ButtonRole::Allow).await.unwrap();
//!     }
//!
//!     // Scroll the submit button above the keyboard.
//!     ScrollSearch::new(driver)
//!         .reveal(&Selector::id("form"), &Selector::id("submit"), &[Obstruction::Keyboard])
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod alert;
pub mod config;
pub mod driver;
pub mod element;
pub mod geometry;
pub mod obstruction;
pub mod scroll;
pub mod snapshot;
