/// The supported file formats for exported tables.
///
/// `ValueEnum` lets the CLI take this enum directly as a flag value. Each variant maps to a
/// concrete `RowEncoder` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputType {
    /// Comma-separated values with a header row.
    #[default]
    Csv,

    /// A single JSON array of row objects.
    Json,
}

impl OutputType {
    /// File extension (without the dot) for tables written in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}
