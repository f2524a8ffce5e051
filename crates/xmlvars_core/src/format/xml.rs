//! quick-xml reader/writer for settings documents.
//!
//! Both layouts are accepted on read; only the grouped layout is written.
//! All variable data lives in attributes, so body text must be whitespace.

use super::migrations::check_version;
use super::{FormatError, FormatHeader, FormatResult, Layout, CURRENT_FORMAT_VERSION};
use crate::model::document::SettingsDocument;
use crate::model::value::{Value, VariableType};
use crate::model::variable::Variable;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

const ROOT_TAG: &str = "settings";
const GROUP_TAG: &str = "group";
const VARIABLE_TAG: &str = "variable";

fn malformed(message: impl Into<String>) -> FormatError {
    FormatError::Malformed(message.into())
}

/// Reads the root element only and returns its version metadata.
///
/// A missing `version` attribute marks a legacy flat file (version 1).
pub fn read_header(xml: &str) -> FormatResult<FormatHeader> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() != ROOT_TAG.as_bytes() {
                    return Err(malformed(format!(
                        "root element is `{}`, expected `{ROOT_TAG}`",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                let attrs = collect_attrs(e)?;
                return header_from_attrs(&attrs);
            }
            Ok(Event::Text(ref text)) if !is_blank(text) => {
                return Err(malformed("text before root element"));
            }
            Ok(Event::GeneralRef(_)) | Ok(Event::CData(_)) => {
                return Err(malformed("text before root element"));
            }
            Ok(Event::Eof) => return Err(malformed("missing root element")),
            Err(err) => {
                return Err(malformed(format!(
                    "xml error at byte {}: {err}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Parses a whole settings file in either layout.
///
/// # Errors
/// - `UnsupportedVersion` when the header is newer than this build.
/// - `Malformed` for any structural or value problem.
pub fn parse_document(xml: &str) -> FormatResult<(SettingsDocument, FormatHeader)> {
    let header = read_header(xml)?;
    check_version(header.version)?;
    let layout = header.layout();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut doc = SettingsDocument::new();
    let mut root_open = false;
    let mut root_done = false;
    let mut group: Option<VariableType> = None;
    let mut in_variable = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|err| {
            malformed(format!(
                "xml error at byte {}: {err}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if root_done {
                    return Err(malformed("content after root element"));
                }
                if in_variable {
                    return Err(malformed("`variable` elements cannot have children"));
                }

                match e.name().as_ref() {
                    b"settings" if !root_open => {
                        let attrs = collect_attrs(e)?;
                        doc.set_locked(parse_locked(&attrs, layout)?);
                        if is_empty {
                            root_done = true;
                        } else {
                            root_open = true;
                        }
                    }
                    b"group" if root_open && layout == Layout::Grouped && group.is_none() => {
                        let attrs = collect_attrs(e)?;
                        let kind = required_kind(&attrs, GROUP_TAG)?;
                        if !is_empty {
                            group = Some(kind);
                        }
                    }
                    b"variable" if root_open => {
                        let attrs = collect_attrs(e)?;
                        let variable = match (layout, group) {
                            (Layout::Flat, None) => {
                                let kind = required_kind(&attrs, VARIABLE_TAG)?;
                                variable_from_attrs(&attrs, kind)?
                            }
                            (Layout::Grouped, Some(kind)) => {
                                if let Some(tag) = attr(&attrs, "type") {
                                    if tag != kind.tag() {
                                        return Err(malformed(format!(
                                            "variable of type `{tag}` inside `{}` group",
                                            kind.tag()
                                        )));
                                    }
                                }
                                variable_from_attrs(&attrs, kind)?
                            }
                            (Layout::Grouped, None) => {
                                return Err(malformed("`variable` outside of a `group`"))
                            }
                            (Layout::Flat, Some(_)) => {
                                return Err(malformed("`group` in a flat layout file"))
                            }
                        };
                        doc.insert(variable).map_err(|duplicate| {
                            malformed(format!("duplicate variable `{}`", duplicate.name()))
                        })?;
                        if !is_empty {
                            in_variable = true;
                        }
                    }
                    other => {
                        return Err(malformed(format!(
                            "unexpected element `{}`",
                            String::from_utf8_lossy(other)
                        )))
                    }
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"variable" => in_variable = false,
                b"group" => group = None,
                b"settings" => {
                    root_open = false;
                    root_done = true;
                }
                _ => {}
            },
            Event::Text(ref text) if !is_blank(text) => {
                return Err(malformed("unexpected text content"));
            }
            Event::GeneralRef(_) | Event::CData(_) => {
                return Err(malformed("unexpected text content"));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !root_done {
        return Err(malformed("root element is not closed"));
    }
    Ok((doc, header))
}

/// Serializes a document in the current grouped layout.
///
/// Empty groups are omitted. Output starts with an XML declaration and uses
/// two-space indentation.
pub fn write_document(doc: &SettingsDocument) -> FormatResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let version = CURRENT_FORMAT_VERSION.to_string();
    let mut root = BytesStart::new(ROOT_TAG);
    root.push_attribute(("version", version.as_str()));
    root.push_attribute(("locked", if doc.is_locked() { "true" } else { "false" }));

    if doc.is_empty() {
        emit(&mut writer, Event::Empty(root))?;
    } else {
        emit(&mut writer, Event::Start(root))?;
        for kind in VariableType::ALL {
            let variables = doc.of_type(kind);
            if variables.is_empty() {
                continue;
            }

            let mut group = BytesStart::new(GROUP_TAG);
            group.push_attribute(("type", kind.tag()));
            emit(&mut writer, Event::Start(group))?;
            for variable in variables {
                let value = variable.value().to_wire();
                let default = variable.default_value().to_wire();
                let mut node = BytesStart::new(VARIABLE_TAG);
                node.push_attribute(("name", variable.name()));
                node.push_attribute(("value", value.as_str()));
                node.push_attribute(("default", default.as_str()));
                emit(&mut writer, Event::Empty(node))?;
            }
            emit(&mut writer, Event::End(BytesEnd::new(GROUP_TAG)))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new(ROOT_TAG)))?;
    }

    let mut xml = String::from_utf8(writer.into_inner())
        .map_err(|err| malformed(format!("writer produced invalid UTF-8: {err}")))?;
    xml.push('\n');
    Ok(xml)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> FormatResult<()> {
    writer
        .write_event(event)
        .map_err(|err| malformed(format!("failed to write xml: {err}")))
}

fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Collects attributes as unescaped `(key, value)` pairs.
fn collect_attrs(e: &BytesStart<'_>) -> FormatResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(format!("bad attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|_| malformed(format!("attribute `{key}` is not UTF-8")))?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|err| malformed(format!("attribute `{key}`: {err}")))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn required<'a>(attrs: &'a [(String, String)], key: &str, element: &str) -> FormatResult<&'a str> {
    attr(attrs, key).ok_or_else(|| malformed(format!("`{element}` is missing `{key}`")))
}

fn required_kind(attrs: &[(String, String)], element: &str) -> FormatResult<VariableType> {
    let tag = required(attrs, "type", element)?;
    VariableType::from_tag(tag).ok_or_else(|| malformed(format!("unknown variable type `{tag}`")))
}

fn header_from_attrs(attrs: &[(String, String)]) -> FormatResult<FormatHeader> {
    match attr(attrs, "version") {
        None => Ok(FormatHeader {
            version: 1,
            explicit_version: false,
        }),
        Some(text) => {
            let version = text
                .trim()
                .parse::<u32>()
                .map_err(|_| malformed(format!("invalid format version `{text}`")))?;
            Ok(FormatHeader {
                version,
                explicit_version: true,
            })
        }
    }
}

fn parse_locked(attrs: &[(String, String)], layout: Layout) -> FormatResult<bool> {
    match (layout, attr(attrs, "locked")) {
        (_, None) | (Layout::Flat, Some(_)) => Ok(false),
        (Layout::Grouped, Some("true")) => Ok(true),
        (Layout::Grouped, Some("false")) => Ok(false),
        (Layout::Grouped, Some(other)) => Err(malformed(format!("invalid lock flag `{other}`"))),
    }
}

fn variable_from_attrs(attrs: &[(String, String)], kind: VariableType) -> FormatResult<Variable> {
    let name = required(attrs, "name", VARIABLE_TAG)?;
    let value = required(attrs, "value", VARIABLE_TAG)?;
    let default = required(attrs, "default", VARIABLE_TAG)?;

    let value = Value::parse(kind, value)
        .map_err(|err| malformed(format!("variable `{name}` value: {err}")))?;
    let default = Value::parse(kind, default)
        .map_err(|err| malformed(format!("variable `{name}` default: {err}")))?;

    Variable::with_value(name, value, default).map_err(|err| malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_document, read_header, write_document};
    use crate::format::{FormatError, Layout, CURRENT_FORMAT_VERSION};
    use crate::model::document::SettingsDocument;
    use crate::model::value::{Value, VariableType};
    use crate::model::variable::Variable;

    #[test]
    fn header_without_version_is_legacy_flat() {
        let header = read_header("<settings><variable/></settings>").unwrap();
        assert_eq!(header.version, 1);
        assert!(!header.explicit_version);
        assert_eq!(header.layout(), Layout::Flat);
    }

    #[test]
    fn header_rejects_foreign_root() {
        let err = read_header("<?xml version=\"1.0\"?><config/>").unwrap_err();
        assert!(matches!(err, FormatError::Malformed(message) if message.contains("config")));
    }

    #[test]
    fn header_rejects_non_numeric_version() {
        assert!(matches!(
            read_header("<settings version=\"two\"/>"),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn written_document_parses_back_with_escaped_strings() {
        let mut doc = SettingsDocument::new();
        doc.insert(Variable::new("motd", Value::from("a < b & \"c\"")).unwrap())
            .unwrap();
        doc.insert(Variable::new("ratio", Value::Double(0.25)).unwrap())
            .unwrap();
        doc.set_locked(true);

        let xml = write_document(&doc).unwrap();
        assert!(xml.contains(&format!("version=\"{CURRENT_FORMAT_VERSION}\"")));
        assert!(xml.contains("&lt;"));

        let (parsed, header) = parse_document(&xml).unwrap();
        assert_eq!(header.layout(), Layout::Grouped);
        assert_eq!(parsed, doc);
    }

    #[test]
    fn empty_document_writes_self_closing_root() {
        let xml = write_document(&SettingsDocument::new()).unwrap();
        assert!(xml.contains("<settings version=\"2\" locked=\"false\"/>"));
        let (parsed, _) = parse_document(&xml).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn flat_layout_is_parsed_into_groups() {
        let xml = r#"<settings version="1">
            <variable name="count" type="integer" value="3" default="1"/>
            <variable name="debug" type="boolean" value="false" default="false"/>
        </settings>"#;
        let (doc, header) = parse_document(xml).unwrap();
        assert_eq!(header.layout(), Layout::Flat);
        assert_eq!(doc.of_type(VariableType::Integer).len(), 1);
        assert_eq!(doc.get("count").unwrap().value(), &Value::Integer(3));
        assert!(!doc.is_locked());
    }

    #[test]
    fn grouped_variable_outside_group_is_malformed() {
        let xml = r#"<settings version="2"><variable name="a" value="1" default="1"/></settings>"#;
        assert!(matches!(
            parse_document(xml),
            Err(FormatError::Malformed(message)) if message.contains("outside")
        ));
    }

    #[test]
    fn bad_values_and_duplicates_are_malformed() {
        let bad_value = r#"<settings version="2"><group type="byte">
            <variable name="b" value="300" default="0"/></group></settings>"#;
        assert!(matches!(
            parse_document(bad_value),
            Err(FormatError::Malformed(_))
        ));

        let duplicate = r#"<settings version="2">
            <group type="integer"><variable name="x" value="1" default="1"/></group>
            <group type="long"><variable name="x" value="1" default="1"/></group>
        </settings>"#;
        assert!(matches!(
            parse_document(duplicate),
            Err(FormatError::Malformed(message)) if message.contains("duplicate")
        ));
    }

    #[test]
    fn entity_and_cdata_body_content_is_malformed() {
        for body in ["&amp;", "<![CDATA[junk]]>", "<group type=\"long\">&#65;</group>"] {
            let xml = format!(r#"<settings version="2" locked="false">{body}</settings>"#);
            assert!(
                matches!(
                    parse_document(&xml),
                    Err(FormatError::Malformed(message)) if message.contains("text")
                ),
                "`{body}` should be rejected"
            );
        }
    }

    #[test]
    fn truncated_file_is_malformed() {
        let xml = r#"<settings version="2"><group type="integer">"#;
        assert!(matches!(parse_document(xml), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn newer_version_is_unsupported() {
        let err = parse_document(r#"<settings version="9"/>"#).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnsupportedVersion {
                file_version: 9,
                latest_supported: CURRENT_FORMAT_VERSION,
            }
        );
    }
}
