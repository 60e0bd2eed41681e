use std::ops::Range;
use serde::Serialize;

/// One `solid ... endsolid` block found in an ASCII STL document.
///
/// Line indices are 0-based and inclusive, as counted by `str::lines()`. `span` is the byte
/// range of the same lines in the scanned text, line terminators included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolidDescriptor {
    pub name: String,
    pub facet_count: usize,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip)]
    pub span: Range<usize>,
}

// Returns the name if the line opens a solid
fn solid_header(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix("solid")?;
    if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some(rest.trim())
}

fn is_endsolid(line: &str) -> bool {
    line.split_ascii_whitespace().next() == Some("endsolid")
}

fn is_facet_header(line: &str) -> bool {
    let mut words = line.split_ascii_whitespace();
    words.next() == Some("facet") && words.next() == Some("normal")
}

// Same lines as `str::lines()`, each one with the byte offset just past its terminator
fn lines_with_end(text: &str) -> impl Iterator<Item = (&str, usize)> {
    let mut end = 0;
    text.split_inclusive('\n').map(move |raw| {
        end += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (line, end)
    })
}

/// Finds every solid in the document, in file order, without parsing the geometry.
///
/// A solid without `endsolid` extends to the last line of the document.
pub fn scan_solids(text: &str) -> Vec<SolidDescriptor> {
    let mut solids = Vec::new();
    let mut current: Option<SolidDescriptor> = None;
    let mut last_line = 0;
    let mut line_start = 0;

    for (i_line, (line, line_end)) in lines_with_end(text).enumerate() {
        last_line = i_line;
        match &mut current {
            None => {
                if let Some(name) = solid_header(line) {
                    current = Some(SolidDescriptor {
                        name: name.to_owned(),
                        facet_count: 0,
                        start_line: i_line,
                        end_line: i_line,
                        span: line_start .. line_end,
                    });
                }
            }
            Some(solid) => {
                if is_endsolid(line) {
                    solid.end_line = i_line;
                    solid.span.end = line_end;
                    solids.extend(current.take());
                } else if is_facet_header(line) {
                    solid.facet_count += 1;
                }
            }
        }
        line_start = line_end;
    }
    if let Some(mut solid) = current {
        log::warn!("solid {:?} has no endsolid, assuming it ends at the last line", solid.name);
        solid.end_line = last_line;
        solid.span.end = text.len();
        solids.push(solid);
    }
    solids
}

/// Returns the lines of the document covered by `solid`.
///
/// `text` must be the document that `solid` was scanned from, otherwise the result is empty.
pub fn extract_solid<'a>(text: &'a str, solid: &SolidDescriptor) -> &'a str {
    text.get(solid.span.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facet() -> &'static str {
        "facet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\n"
    }

    fn block(name: &str, facets: usize) -> String {
        let mut s = format!("solid {name}\n");
        for _ in 0 .. facets {
            s.push_str(facet());
        }
        s.push_str(&format!("endsolid {name}\n"));
        s
    }

    #[test]
    fn finds_every_solid_in_order() {
        let text = [block("house_1", 2), block("oak tree", 3), block("road", 0)].concat();
        let solids = scan_solids(&text);
        assert_eq!(solids.len(), 3);
        assert_eq!(solids[0].name, "house_1");
        assert_eq!(solids[0].facet_count, 2);
        assert_eq!(solids[0].start_line, 0);
        assert_eq!(solids[0].end_line, 15);
        assert_eq!(solids[1].name, "oak tree");
        assert_eq!(solids[1].facet_count, 3);
        assert_eq!(solids[1].start_line, 16);
        assert_eq!(solids[2].name, "road");
        assert_eq!(solids[2].facet_count, 0);
        assert_eq!(solids[2].start_line, solids[1].end_line + 1);
        assert_eq!(solids[2].end_line, solids[2].start_line + 1);
    }

    #[test]
    fn bare_endsolid_and_empty_name() {
        let text = format!("solid\n{}endsolid\n", facet());
        let solids = scan_solids(&text);
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].name, "");
        assert_eq!(solids[0].facet_count, 1);
    }

    #[test]
    fn missing_endsolid_runs_to_last_line() {
        let text = format!("solid broken\n{}{}", facet(), facet());
        let solids = scan_solids(&text);
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].facet_count, 2);
        assert_eq!(solids[0].end_line, text.lines().count() - 1);
    }

    #[test]
    fn keyword_is_case_sensitive() {
        let text = "SOLID a\nendsolid a\nsolidity\nendsolid\n";
        assert!(scan_solids(text).is_empty());
    }

    #[test]
    fn extract_returns_the_block() {
        let text = [block("a", 1), block("b", 2)].concat();
        let solids = scan_solids(&text);
        let b = extract_solid(&text, &solids[1]);
        assert!(b.starts_with("solid b\n"));
        assert!(b.ends_with("endsolid b\n"));
        assert_eq!(b.lines().count(), 2 + 2 * 7);
        assert_eq!(b.lines().count(), solids[1].end_line + 1 - solids[1].start_line);
    }

    #[test]
    fn spans_follow_crlf_and_unterminated_blocks() {
        let text = "solid a\r\nfacet normal 0 0 1\r\nendsolid a\r\nsolid b\r\nfacet normal 0 0 1";
        let solids = scan_solids(text);
        assert_eq!(solids.len(), 2);
        assert_eq!(extract_solid(text, &solids[0]), "solid a\r\nfacet normal 0 0 1\r\nendsolid a\r\n");
        assert_eq!(extract_solid(text, &solids[1]), "solid b\r\nfacet normal 0 0 1");
        assert_eq!((solids[1].start_line, solids[1].end_line), (3, 4));
    }

    #[test]
    fn extracts_each_of_many_solids() {
        let text: String = (0 .. 5000).map(|i| block(&format!("part_{i}"), 1)).collect();
        let solids = scan_solids(&text);
        assert_eq!(solids.len(), 5000);
        for (i, solid) in solids.iter().enumerate() {
            let b = extract_solid(&text, solid);
            assert_eq!(b, block(&format!("part_{i}"), 1));
        }
    }
}
