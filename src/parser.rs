use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::error::{ParseError, PointDefect};
use crate::gpx_types::*;
use crate::options::ParseOptions;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a GPX XML string into its flattened track points and document metadata.
///
/// Every `<trkseg>` of every `<trk>` is concatenated in document order. Waypoints,
/// routes and extensions are skipped.
pub fn parse_document(xml: &str, opts: &ParseOptions) -> Result<ParsedDocument> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"gpx" => {
                return parse_gpx_body(&mut reader, opts);
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"gpx" => {
                return Err(ParseError::MissingTrack);
            }
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) => return Err(ParseError::MissingRoot),
            Ok(Event::Eof) => return Err(ParseError::MissingRoot),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }
}

/// Collects track points across segments and tracks, applying the invalid-point policy.
struct PointSink<'o> {
    opts: &'o ParseOptions,
    points: Vec<GeoPoint>,
    seen: usize,
    skipped: usize,
}

impl<'o> PointSink<'o> {
    fn new(opts: &'o ParseOptions) -> Self {
        Self {
            opts,
            points: Vec::new(),
            seen: 0,
            skipped: 0,
        }
    }

    /// Validate the coordinates of a `<trkpt>` start tag.
    /// `Ok(None)` means the point was skipped.
    fn begin(&mut self, start: &BytesStart<'_>) -> Result<Option<GeoPoint>> {
        let index = self.seen;
        self.seen += 1;

        match parse_lat_lon(start)? {
            Ok((lat, lon)) => Ok(Some(GeoPoint::new(lat, lon))),
            Err(reason) if self.opts.strict_points => {
                Err(ParseError::InvalidPoint { index, reason })
            }
            Err(reason) => {
                warn!(index, %reason, "skipping invalid track point");
                self.skipped += 1;
                Ok(None)
            }
        }
    }
}

/// Parse the children of the `<gpx>` root.
fn parse_gpx_body<'a>(
    reader: &mut Reader<&'a [u8]>,
    opts: &ParseOptions,
) -> Result<ParsedDocument> {
    let mut sink = PointSink::new(opts);
    let mut metadata = DocumentMeta::default();
    let mut track_meta = DocumentMeta::default();
    let mut saw_track = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"metadata" => metadata = parse_metadata(reader)?,
                b"trk" => {
                    saw_track = true;
                    let meta = parse_track(reader, &mut sink)?;
                    track_meta = merge_meta(track_meta, meta);
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trk" {
                    saw_track = true;
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"gpx" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element: "gpx" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    if !saw_track {
        return Err(ParseError::MissingTrack);
    }

    Ok(ParsedDocument {
        meta: merge_meta(metadata, track_meta),
        points: sink.points,
        skipped_points: sink.skipped,
    })
}

/// Keep every field already set in `primary`, fill the rest from `fallback`.
fn merge_meta(primary: DocumentMeta, fallback: DocumentMeta) -> DocumentMeta {
    DocumentMeta {
        name: primary.name.or(fallback.name),
        description: primary.description.or(fallback.description),
        time: primary.time.or(fallback.time),
    }
}

/// Parse a `<metadata>` element.
fn parse_metadata<'a>(reader: &mut Reader<&'a [u8]>) -> Result<DocumentMeta> {
    let mut meta = DocumentMeta::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => meta.name = non_empty(read_text_owned(reader, &e, "name")?),
                b"desc" => meta.description = non_empty(read_text_owned(reader, &e, "desc")?),
                b"time" => meta.time = parse_time(&read_text_owned(reader, &e, "time")?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element: "metadata" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(meta)
}

/// Parse a `<trk>` element, pushing its points into `sink`.
fn parse_track<'a>(
    reader: &mut Reader<&'a [u8]>,
    sink: &mut PointSink<'_>,
) -> Result<DocumentMeta> {
    let mut meta = DocumentMeta::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => meta.name = non_empty(read_text_owned(reader, &e, "name")?),
                b"desc" => meta.description = non_empty(read_text_owned(reader, &e, "desc")?),
                b"time" => meta.time = parse_time(&read_text_owned(reader, &e, "time")?),
                b"trkseg" => parse_segment(reader, sink)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element: "trk" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(meta)
}

/// Parse a `<trkseg>` element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>, sink: &mut PointSink<'_>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => parse_point(&e, reader, sink)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt"
                    && let Some(pt) = sink.begin(&e)?
                {
                    sink.points.push(pt);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element: "trkseg" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(())
}

/// Parse a `<trkpt>` element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    sink: &mut PointSink<'_>,
) -> Result<()> {
    let Some(mut point) = sink.begin(start)? else {
        reader.read_to_end(start.name())?;
        return Ok(());
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e, "ele")?;
                    point.elevation = parse_elevation(&text);
                }
                b"time" => {
                    point.timestamp = parse_time(&read_text_owned(reader, &e, "time")?);
                }
                _ => {
                    // Skip unknown/extensions elements
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkpt" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element: "trkpt" }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    sink.points.push(point);
    Ok(())
}

/// Parse lat/lon attributes from a `<trkpt>` start tag.
///
/// The outer error is an XML syntax failure; the inner one a rejected point.
fn parse_lat_lon(e: &BytesStart<'_>) -> Result<std::result::Result<(f64, f64), PointDefect>> {
    let mut lat_text = None;
    let mut lon_text = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default().trim().to_string();
        match attr.key.local_name().as_ref() {
            b"lat" => lat_text = Some(val),
            b"lon" => lon_text = Some(val),
            _ => {}
        }
    }

    let Some(lat_text) = lat_text else {
        return Ok(Err(PointDefect::MissingAttribute("lat")));
    };
    let Some(lon_text) = lon_text else {
        return Ok(Err(PointDefect::MissingAttribute("lon")));
    };

    Ok(coordinate("lat", &lat_text, 90.0).and_then(|lat| {
        coordinate("lon", &lon_text, 180.0).map(|lon| (lat, lon))
    }))
}

fn coordinate(
    attribute: &'static str,
    text: &str,
    limit: f64,
) -> std::result::Result<f64, PointDefect> {
    let value = text
        .parse::<f64>()
        .map_err(|_| PointDefect::InvalidAttribute {
            attribute,
            value: text.to_string(),
        })?;
    if !(-limit..=limit).contains(&value) {
        return Err(PointDefect::OutOfRange { attribute, value });
    }
    Ok(value)
}

fn parse_elevation(text: &str) -> Option<f64> {
    match text.trim().parse::<f64>() {
        Ok(ele) if ele.is_finite() => Some(ele),
        _ => {
            warn!(text, "ignoring unparseable elevation");
            None
        }
    }
}

/// RFC 3339, or an ISO-8601 local date-time without offset read as UTC.
fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(naive) => Some(naive.and_utc()),
            Err(_) => {
                warn!(text, error = %e, "ignoring unparseable timestamp");
                None
            }
        },
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'_>,
    element: &'static str,
) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Ok(Event::CData(e)) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                    match name {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof { element }),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(text)
}
