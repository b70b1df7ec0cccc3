use winnow::ascii::{space0, space1};
use winnow::combinator::{alt, opt, preceded, separated_pair};
use winnow::error::{StrContext, StrContextValue};
use winnow::token::take_while;
use winnow::{ModalResult, Parser};

use crate::cache::AccessKind;

/// One parsed trace line: `<op> <address-hex>,<size-decimal>`.
///
/// `size` is carried along for completeness but has no effect on hit/miss
/// or dirty accounting; only the operation and the address matter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub address: u64,
    pub size: u64,
}

/// A memory-access trace, parsed line by line.
///
/// Lines that do not match the record grammar are skipped (counted, not
/// fatal) and parsing continues with the next line. Blank lines are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    records: Vec<TraceRecord>,
    skipped_lines: usize,
}

impl Trace {
    pub fn parse(input: &str) -> Self {
        let mut records = Vec::new();
        let mut skipped_lines = 0;

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match record.parse(line) {
                Ok(rec) => records.push(rec),
                Err(_) => skipped_lines += 1,
            }
        }

        Self {
            records,
            skipped_lines,
        }
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

impl IntoIterator for Trace {
    type Item = TraceRecord;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

fn record(input: &mut &str) -> ModalResult<TraceRecord> {
    (
        preceded(space0, operation),
        preceded(space1, separated_pair(hex_address, ',', decimal_integer)),
    )
        .parse_next(input)
        .map(|(kind, (address, size))| TraceRecord {
            kind,
            address,
            size,
        })
}

fn operation(input: &mut &str) -> ModalResult<AccessKind> {
    alt(('L'.value(AccessKind::Load), 'S'.value(AccessKind::Store)))
        .context(StrContext::Label("operation"))
        .context(StrContext::Expected(StrContextValue::Description(
            "'L' (load) or 'S' (store)",
        )))
        .parse_next(input)
}

fn hex_address(input: &mut &str) -> ModalResult<u64> {
    preceded(
        opt("0x"),
        take_while(1.., ('0'..='9', 'a'..='f', 'A'..='F')),
    )
    .try_map(|s| u64::from_str_radix(s, 16))
    .context(StrContext::Label("address"))
    .parse_next(input)
}

fn decimal_integer(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., '0'..='9')
        .try_map(str::parse::<u64>)
        .context(StrContext::Label("size"))
        .parse_next(input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_load_and_store_records() {
        let trace = Trace::parse("L 10,1\nS ff,4\n");

        assert_eq!(
            trace.records(),
            &[
                TraceRecord {
                    kind: AccessKind::Load,
                    address: 0x10,
                    size: 1,
                },
                TraceRecord {
                    kind: AccessKind::Store,
                    address: 0xff,
                    size: 4,
                },
            ]
        );
        assert_eq!(trace.skipped_lines(), 0);
    }

    #[test]
    fn accepts_prefixed_hex_and_leading_whitespace() {
        let trace = Trace::parse("  L 0x7fffcaffee00,8");

        assert_eq!(
            trace.records(),
            &[TraceRecord {
                kind: AccessKind::Load,
                address: 0x7fff_caff_ee00,
                size: 8,
            }]
        );
    }

    #[test]
    fn skips_malformed_lines_and_continues() {
        let trace = Trace::parse("L 10,1\nI 400,2\nM zz,1\nS 20,1\n");

        assert_eq!(trace.records().len(), 2);
        assert_eq!(trace.records()[1].address, 0x20);
        assert_eq!(trace.skipped_lines(), 2);
    }

    #[test]
    fn blank_lines_are_not_counted_as_skipped() {
        let trace = Trace::parse("\nL 10,1\n\n\nL 20,1\n");

        assert_eq!(trace.records().len(), 2);
        assert_eq!(trace.skipped_lines(), 0);
    }

    #[test]
    fn rejects_records_missing_a_field() {
        let trace = Trace::parse("L 10\nS ,1\nL\n");

        assert!(trace.records().is_empty());
        assert_eq!(trace.skipped_lines(), 3);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let trace = Trace::parse("L 10,1 extra");

        assert!(trace.records().is_empty());
        assert_eq!(trace.skipped_lines(), 1);
    }
}
