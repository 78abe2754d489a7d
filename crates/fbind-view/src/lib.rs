#![forbid(unsafe_code)]

//! Headless view adapter for `fbind-core`.
//!
//! Mounts a [`NodeRef`] tree against observed data: every `{{ path }}`
//! placeholder in a text node and every `input` carrying a `model` (or
//! `v-model`) attribute becomes a binding. Writes to the data re-render the
//! affected nodes before the write returns; [`ViewModel::input`] feeds user
//! edits back into the data.
//!
//! ```
//! use fbind_view::{ViewConfig, ViewModel, element, text};
//! use serde_json::json;
//!
//! let mut vm = ViewModel::with_config(json!({"name": "Ann"}), ViewConfig::default()).unwrap();
//! let input = element("input").attr("model", "name");
//! let page = element("p").child(text("Hello, {{ name }}!")).child(input.clone());
//! vm.mount(&page).unwrap();
//! assert_eq!(page.render_html(), "<p>Hello, Ann!<input model=\"name\" value=\"Ann\"></p>");
//!
//! vm.input(&input, "Bo").unwrap();
//! assert_eq!(page.render_html(), "<p>Hello, Bo!<input model=\"name\" value=\"Bo\"></p>");
//! ```

pub mod config;
pub mod error;
pub mod interpolate;
pub mod mount;
pub mod node;

pub use config::{ViewConfig, ViewConfigParse};
pub use error::{MountError, ViewError};
pub use interpolate::{Segment, Template};
pub use mount::ViewModel;
pub use node::{NodeData, NodeRef, element, text};
