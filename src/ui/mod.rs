pub mod chat;
pub mod dispatch;
pub mod editor;
pub mod settings;
pub mod sidebar;
pub mod text;
pub mod welcome;

pub use dispatch::Dispatcher;

use crate::store::Stores;
use crate::theme::Theme;
use text::Strings;

/// What every pane needs to draw itself and start actions.
pub struct View<'a> {
    pub stores: &'a Stores,
    pub dispatcher: &'a Dispatcher,
    pub theme: &'a Theme,
    pub text: &'static Strings,
}
