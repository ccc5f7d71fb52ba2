pub mod buffer2;
pub mod cancel_flag;
pub mod file_format;
pub mod log_setup;
pub mod shared_fn;

pub use buffer2::Buffer2;
pub use cancel_flag::CancelFlag;
pub use file_format::{
    deserialize, get_file_extension, load_file, serialize, FileExtensionError, FileFormat,
    FileFormatResult, SerdeFormatError, SerdeFormatResult,
};
pub use shared_fn::SharedFn;
