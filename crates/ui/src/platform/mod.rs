mod scripts;
mod webview;

pub use scripts::scroll_to_end_script;
pub use webview::{WebviewClipPlayer, WebviewSynthesizer};
