//! Common test utilities for integration tests

use std::fs;
use std::io::Write;
use std::path::Path;

/// Helper function to create a test XML file in a directory
#[allow(dead_code)]
pub fn create_test_xml_file(path: &Path, content: &str) {
    let parent = path.parent().unwrap();
    fs::create_dir_all(parent).unwrap();
    fs::File::create(path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}

/// Counts leftover intermediate chunk files in a directory
#[allow(dead_code)]
pub fn count_chunk_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_chunk_"))
        .count()
}

/// Sample situation feed with two groups and nested record content
#[allow(dead_code)]
pub const SAMPLE_SITUATION_FEED: &str = r#"<?xml version="1.0"?>
<payload>
  <situation id="RWS01_1">
    <situationRecord unit="kmh">
      <speed>80</speed>
      <validity>
        <validityStatus>active</validityStatus>
      </validity>
    </situationRecord>
    <situationRecord>
      <speed>100</speed>
    </situationRecord>
  </situation>
  <situation id="RWS01_2">
    <situationRecord>
      <delay>120</delay>
    </situationRecord>
  </situation>
</payload>"#;

/// Same structure under a DATEX II namespace prefix
#[allow(dead_code)]
pub const NAMESPACED_SITUATION_FEED: &str = r#"<?xml version="1.0"?>
<d2:payload xmlns:d2="http://datex2.eu/schema/2/2_0">
  <d2:situation id="NS_1">
    <d2:situationRecord>
      <d2:speed>80</d2:speed>
    </d2:situationRecord>
  </d2:situation>
</d2:payload>"#;

/// Feed whose two identical groups produce exact-duplicate rows
#[allow(dead_code)]
pub const DUPLICATE_ROWS_FEED: &str = r#"<?xml version="1.0"?>
<payload>
  <situation id="DUP_1">
    <situationRecord><speed>80</speed></situationRecord>
  </situation>
  <situation id="DUP_1">
    <situationRecord><speed>80</speed></situationRecord>
  </situation>
</payload>"#;

/// Feed with no record elements at all
#[allow(dead_code)]
pub const EMPTY_FEED: &str = r#"<?xml version="1.0"?>
<payload>
  <situation id="EMPTY_1"/>
</payload>"#;
