pub mod client;
pub mod traits;
pub mod types;
pub mod util;

pub use client::ChatClient;
pub use traits::{ChatModel, ChatPrompt};
pub use util::{extract_json_block, strip_code_blocks, truncate_to_char_boundary};
