pub trait ResultExt<T, E> {
	/// Logs the error, including its sources, and discards it.
	fn ok_or_log(self) -> Option<T>
	where
		E: std::fmt::Display;

	fn ok_or_warn(self) -> Option<T>
	where
		E: std::fmt::Display;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
	fn ok_or_log(self) -> Option<T>
	where
		E: std::fmt::Display,
	{
		self.inspect_err(|err| tracing::error!("{:#}", err)).ok()
	}

	fn ok_or_warn(self) -> Option<T>
	where
		E: std::fmt::Display,
	{
		self.inspect_err(|err| tracing::warn!("{:#}", err)).ok()
	}
}
