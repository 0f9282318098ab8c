pub mod generate_keys;
pub mod run;
pub mod version;

pub use generate_keys::GenerateKeys;
pub use run::Run;
pub use version::Version;
