use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const LINE_TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:3]");

// Local wall-clock time. Falls back to UTC when the local offset is unknown
// (e.g. multithreaded processes on some Unix targets).
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn format_line_timestamp(at: OffsetDateTime) -> String {
    at.format(LINE_TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| format!("{:02}:{:02}:{:02}", at.hour(), at.minute(), at.second()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_format_line_timestamp_pads_and_keeps_millis() {
        let at = datetime!(2024-03-07 09:05:03.042 UTC);
        assert_eq!(format_line_timestamp(at), "09:05:03.042");
    }
}
