//! Interactive OAuth2 login through the user's browser.

pub mod callback;
pub mod flow;
pub mod launcher;
pub mod pages;

pub use callback::{CallbackListener, CallbackOutcome};
pub use flow::{authorization_url, BrowserAuthFlow, FlowState};
pub use launcher::Browser;
