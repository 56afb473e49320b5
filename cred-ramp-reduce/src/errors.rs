pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to resolve input stream \"{name}\"")]
    StreamResolution { name: String },
    #[error("failed to allocate engine buffers for {n_pixels} pixels")]
    Allocation { n_pixels: usize },
    #[error("output stream shape {out_w}x{out_h} does not match input {in_w}x{in_h}")]
    ShapeMismatch {
        in_w: u32,
        in_h: u32,
        out_w: u32,
        out_h: u32,
    },
}

fn _test_error_is_send() {
    fn implements<T: Send>() {}
    implements::<Error>();
}
