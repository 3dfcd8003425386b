pub mod catalog;
pub mod system_prompt;

pub use catalog::{Persona, PersonaCatalog, PersonaError, PersonaSelector, PersonaUpdate};
pub use system_prompt::compose_system_message;
