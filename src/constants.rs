// Default boundary tags for DATEX II situation publications
pub const DEFAULT_GROUP_TAG: &str = "situation";
pub const DEFAULT_RECORD_TAG: &str = "situationRecord";

// Attribute carrying the grouping identifier
pub const GROUP_ID_ATTR: &str = "id";

// Suffix appended to the grouping tag to form the identifier column
pub const GROUP_ID_KEY_SUFFIX: &str = "_id";

// Suffix used when a flattened key collides with one already in the working record
pub const ALT_KEY_SUFFIX: &str = "_alt";

// Records buffered per intermediate Parquet file
pub const DEFAULT_BATCH_SIZE: usize = 10000;

// Intermediate chunk file naming (implementation detail, not a contract)
pub const TEMP_CHUNK_PREFIX: &str = "temp_chunk_";

// Missing grouping identifier policy aliases
pub const CARRY_FORWARD_ALIASES: &[&str] = &["carry", "carry-forward", "cf"];
pub const SKIP_GROUP_ALIASES: &[&str] = &["skip", "skip-group", "sg"];
