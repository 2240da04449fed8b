pub mod errors;
pub mod github;
pub mod provider;

pub use errors::ForgeError;
pub use github::GitHubCli;
pub use provider::LiveStatusProvider;
