pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Store error: {message}")]
	Store { message: String },
	#[error("Invariant violation: {message}")]
	Invariant { message: String },
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<compass_store::Error> for Error {
	fn from(err: compass_store::Error) -> Self {
		Self::Store { message: err.to_string() }
	}
}
