//! Prompt assembly for the remote extractor.
//!
//! The payload is not the whole recognized page: only lines classified as
//! medication, appointment or instruction content are sent, which bounds
//! request size and keeps patient-identity boilerplate local.

use crate::pipeline::lexicon::{classify_segment, SegmentClass};

/// Fixed system instruction. The response contract is the JSON shape
/// [`super::response`] parses.
pub const SYSTEM_INSTRUCTION: &str = "\
Bạn là trợ lý trích xuất đơn thuốc. Đọc văn bản đơn thuốc và trả về đúng một \
khối JSON theo mẫu sau, không thêm lời giải thích:
{
  \"medications\": [
    {
      \"name\": \"...\",
      \"dosage\": \"500mg\",
      \"quantity\": \"14\",
      \"unit\": \"viên\",
      \"frequency\": \"2 lần/ngày\",
      \"timing\": [\"sáng\", \"tối\"],
      \"duration\": \"7 ngày\",
      \"instructions\": [\"uống sau ăn\"]
    }
  ],
  \"appointments\": [
    {
      \"type\": \"general\",
      \"date\": \"2025-01-20\",
      \"time\": \"08:00\",
      \"notes\": \"...\"
    }
  ],
  \"instructions\": [\"...\"],
  \"summary\": \"...\"
}
Giá trị timing chỉ được lấy từ: sáng, trưa, chiều, tối, đêm. \
Trường không có thông tin thì để null hoặc mảng rỗng.";

/// Keep only classified-important lines of the normalized text.
pub fn filter_important_segments(normalized_text: &str) -> String {
    normalized_text
        .lines()
        .filter(|line| classify_segment(line) != SegmentClass::Other)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full user prompt for one document.
pub fn build_prompt(filtered_text: &str) -> String {
    format!("Văn bản đơn thuốc:\n{filtered_text}")
}
