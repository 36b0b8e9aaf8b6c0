mod capability_result;
mod device_type;
mod diagnostic_record;
mod page_context;
mod prompt_state;
mod report_outcome;

pub use capability_result::*;
pub use device_type::*;
pub use diagnostic_record::*;
pub use page_context::*;
pub use prompt_state::*;
pub use report_outcome::*;
