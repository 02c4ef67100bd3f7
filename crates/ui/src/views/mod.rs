mod chat;
mod home;
mod state;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use chat::ChatView;
#[cfg(test)]
pub(crate) use chat::ChatTestHandles;
pub use home::HomeView;
pub use state::ViewError;
