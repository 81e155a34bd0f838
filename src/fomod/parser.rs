// src/fomod/parser.rs

//! Event-driven parser for `ModuleConfig.xml`.
//!
//! Real configs arrive in UTF-8 or UTF-16 with assorted BOMs, so decoding
//! happens before the XML reader ever sees the bytes. The document is read
//! into a small element tree first and mapped onto the model second; the
//! schema is deep enough that interleaving both steps costs more than the
//! intermediate tree does.
//!
//! Any structural problem is a fatal [`Error::Config`]. Dependency kinds the
//! engine cannot evaluate (game-version checks and similar) are the one
//! deliberate leniency: they map to a vacuously-true condition.

use crate::error::{Error, Result};
use crate::fomod::model::{
    Category, Condition, ConditionalInstall, CompositeOp, CopyDirective, FileSet, FileState,
    FlagSet, GroupPolicy, InstallStep, InstallerOption, ModuleConfig, OptionGroup, TypePattern,
    TypeRule,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Parse a config document from raw file bytes, handling BOMs and UTF-16.
pub fn parse_module_config_bytes(bytes: &[u8]) -> Result<ModuleConfig> {
    let text = decode_text(bytes)?;
    parse_module_config(&text)
}

/// Parse a config document from decoded text.
pub fn parse_module_config(text: &str) -> Result<ModuleConfig> {
    let root = parse_tree(text)?;
    if !name_is(&root.name, "config") {
        return Err(Error::Config(format!(
            "root element is <{}>, expected <config>",
            root.name
        )));
    }
    map_config(&root)
}

/// Decode config bytes to text.
///
/// A leading FF FE or FE FF BOM selects UTF-16; EF BB BF is stripped as a
/// UTF-8 BOM; everything else is treated as UTF-8.
fn decode_text(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        decode_utf16(&bytes[2..], false)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        decode_utf16(&bytes[2..], true)
    } else if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Ok(String::from_utf8_lossy(&bytes[3..]).into_owned())
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::Config("truncated UTF-16 config".to_string()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|_| Error::Config("invalid UTF-16 in config".to_string()))
}

// =============================================================================
// Element tree
// =============================================================================

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
    text: String,
}

impl XmlNode {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| name_is(&c.name, name))
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| name_is(&c.name, name))
    }

    fn text(&self) -> &str {
        self.text.trim()
    }
}

/// Tag names compare case-insensitively; authoring tools disagree on case.
fn name_is(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn node_from_start(e: &BytesStart<'_>) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr
            .map_err(|err| Error::Config(format!("bad attribute on <{}>: {}", name, err)))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Config(format!("bad attribute value on <{}>: {}", name, err)))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlNode {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn parse_tree(text: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(text.as_bytes());
    reader.trim_text(true);
    let mut buf = Vec::new();

    // Index 0 is a synthetic document node collecting top-level elements.
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => stack.push(node_from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let node = node_from_start(&e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::Text(t)) => {
                let unescaped = t
                    .unescape()
                    .map_err(|err| Error::Config(format!("bad text content: {}", err)))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() <= 1 {
                    return Err(Error::Config("unexpected closing tag".to_string()));
                }
                let node = stack.pop().unwrap_or_default();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // declarations, comments, processing instructions
            Err(err) => {
                return Err(Error::Config(format!(
                    "invalid XML at byte {}: {}",
                    reader.buffer_position(),
                    err
                )));
            }
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(Error::Config("unexpected end of document".to_string()));
    }
    let document = stack.pop().unwrap_or_default();
    document
        .children
        .into_iter()
        .next()
        .ok_or_else(|| Error::Config("document has no root element".to_string()))
}

// =============================================================================
// Model mapping
// =============================================================================

fn map_config(node: &XmlNode) -> Result<ModuleConfig> {
    let module_name = node
        .child("moduleName")
        .map(|n| n.text().to_string())
        .unwrap_or_default();

    let module_dependencies = node
        .child("moduleDependencies")
        .map(map_condition)
        .transpose()?;

    let mut required = FileSet::default();
    for container in node.children_named("requiredInstallFiles") {
        merge_file_set(&mut required, map_file_set_children(container)?);
    }

    let steps = match node.child("installSteps") {
        Some(container) => container
            .children_named("installStep")
            .map(map_step)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let conditional_installs = match node.child("conditionalFileInstalls") {
        Some(container) => map_conditional_installs(container)?,
        None => Vec::new(),
    };

    Ok(ModuleConfig {
        module_name,
        module_dependencies,
        required,
        steps,
        conditional_installs,
    })
}

fn merge_file_set(into: &mut FileSet, from: FileSet) {
    into.files.extend(from.files);
    into.folders.extend(from.folders);
}

/// Map the `<file>`/`<folder>` children of a container element.
fn map_file_set_children(node: &XmlNode) -> Result<FileSet> {
    let mut set = FileSet::default();
    for child in &node.children {
        if name_is(&child.name, "file") {
            set.files.push(map_directive(child)?);
        } else if name_is(&child.name, "folder") {
            set.folders.push(map_directive(child)?);
        }
    }
    Ok(set)
}

fn map_directive(node: &XmlNode) -> Result<CopyDirective> {
    let source = node
        .attr("source")
        .ok_or_else(|| Error::Config(format!("<{}> missing 'source' attribute", node.name)))?
        .to_string();
    let destination = node.attr("destination").unwrap_or_default().to_string();

    let priority = match node.attr("priority") {
        Some(raw) => raw.trim().parse::<i64>().unwrap_or_else(|_| {
            debug!("ignoring unparseable priority {:?} on {:?}", raw, source);
            0
        }),
        None => 0,
    };

    Ok(CopyDirective {
        source,
        destination,
        priority,
        always_install: bool_attr(node, "alwaysInstall"),
        install_if_usable: bool_attr(node, "installIfUsable"),
    })
}

fn bool_attr(node: &XmlNode, key: &str) -> bool {
    matches!(node.attr(key), Some("true") | Some("True") | Some("1"))
}

fn map_step(node: &XmlNode) -> Result<InstallStep> {
    let name = node.attr("name").unwrap_or_default().to_string();
    let visibility = node.child("visible").map(map_condition).transpose()?;

    let groups = match node.child("optionalFileGroups") {
        Some(container) => container
            .children_named("group")
            .map(map_group)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(InstallStep {
        name,
        visibility,
        groups,
    })
}

fn map_group(node: &XmlNode) -> Result<OptionGroup> {
    let name = node.attr("name").unwrap_or_default().to_string();
    let type_name = node
        .attr("type")
        .ok_or_else(|| Error::Config(format!("group '{}' missing 'type' attribute", name)))?;
    let policy = GroupPolicy::parse(type_name).ok_or_else(|| {
        Error::Config(format!("group '{}' has unknown type '{}'", name, type_name))
    })?;

    let options = match node.child("plugins") {
        Some(container) => container
            .children_named("plugin")
            .map(map_option)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(OptionGroup {
        name,
        policy,
        options,
    })
}

fn map_option(node: &XmlNode) -> Result<InstallerOption> {
    let name = node.attr("name").unwrap_or_default().to_string();
    let description = node
        .child("description")
        .map(|n| n.text().to_string())
        .unwrap_or_default();
    let image = node
        .child("image")
        .and_then(|n| n.attr("path"))
        .map(str::to_string);

    let files = match node.child("files") {
        Some(container) => map_file_set_children(container)?,
        None => FileSet::default(),
    };

    let mut flags = Vec::new();
    if let Some(container) = node.child("conditionFlags") {
        for flag in container.children_named("flag") {
            let flag_name = flag.attr("name").ok_or_else(|| {
                Error::Config(format!("flag in option '{}' missing 'name' attribute", name))
            })?;
            flags.push(FlagSet {
                name: flag_name.to_string(),
                value: flag.text().to_string(),
            });
        }
    }

    let type_rule = node
        .child("typeDescriptor")
        .map(map_type_descriptor)
        .transpose()?;

    Ok(InstallerOption {
        name,
        description,
        image,
        type_rule,
        files,
        flags,
    })
}

fn map_type_descriptor(node: &XmlNode) -> Result<TypeRule> {
    if let Some(simple) = node.child("type") {
        return Ok(TypeRule::Static(required_category(simple)?));
    }

    if let Some(dependent) = node.child("dependencyType") {
        let default = dependent
            .child("defaultType")
            .ok_or_else(|| Error::Config("dependencyType missing <defaultType>".to_string()))
            .and_then(required_category)?;

        let mut patterns = Vec::new();
        if let Some(container) = dependent.child("patterns") {
            for pattern in container.children_named("pattern") {
                let condition = pattern
                    .child("dependencies")
                    .ok_or_else(|| Error::Config("pattern missing <dependencies>".to_string()))
                    .and_then(map_condition)?;
                let category = pattern
                    .child("type")
                    .ok_or_else(|| Error::Config("pattern missing <type>".to_string()))
                    .and_then(required_category)?;
                patterns.push(TypePattern { condition, category });
            }
        }

        return Ok(TypeRule::Dependent { patterns, default });
    }

    Err(Error::Config(
        "typeDescriptor missing <type> or <dependencyType>".to_string(),
    ))
}

fn required_category(node: &XmlNode) -> Result<Category> {
    let name = node
        .attr("name")
        .ok_or_else(|| Error::Config(format!("<{}> missing 'name' attribute", node.name)))?;
    Category::parse(name)
        .ok_or_else(|| Error::Config(format!("unknown option category '{}'", name)))
}

/// Map a dependency container (`<dependencies>`, `<visible>`,
/// `<moduleDependencies>`) to a condition tree, preserving document order.
fn map_condition(node: &XmlNode) -> Result<Condition> {
    let op = match node.attr("operator") {
        Some("Or") => CompositeOp::Or,
        _ => CompositeOp::And,
    };

    let mut children = Vec::new();
    for child in &node.children {
        if name_is(&child.name, "fileDependency") {
            let path = child.attr("file").ok_or_else(|| {
                Error::Config("fileDependency missing 'file' attribute".to_string())
            })?;
            let state = match child.attr("state") {
                Some(raw) => FileState::parse(raw).ok_or_else(|| {
                    Error::Config(format!("unknown file dependency state '{}'", raw))
                })?,
                None => FileState::Active,
            };
            children.push(Condition::FilePresence {
                path: path.to_string(),
                state,
            });
        } else if name_is(&child.name, "flagDependency") {
            let name = child.attr("flag").ok_or_else(|| {
                Error::Config("flagDependency missing 'flag' attribute".to_string())
            })?;
            children.push(Condition::FlagEquals {
                name: name.to_string(),
                value: child.attr("value").unwrap_or_default().to_string(),
            });
        } else if name_is(&child.name, "dependencies") {
            children.push(map_condition(child)?);
        } else {
            // Game/tool version checks and other kinds this engine cannot
            // evaluate never veto a pattern.
            debug!("treating <{}> dependency as always satisfied", child.name);
            children.push(Condition::vacuous());
        }
    }

    Ok(Condition::Composite { op, children })
}

fn map_conditional_installs(node: &XmlNode) -> Result<Vec<ConditionalInstall>> {
    let mut installs = Vec::new();
    if let Some(container) = node.child("patterns") {
        for pattern in container.children_named("pattern") {
            let condition = pattern
                .child("dependencies")
                .ok_or_else(|| {
                    Error::Config("conditional install pattern missing <dependencies>".to_string())
                })
                .and_then(map_condition)?;
            let files = match pattern.child("files") {
                Some(files) => map_file_set_children(files)?,
                None => FileSet::default(),
            };
            installs.push(ConditionalInstall { condition, files });
        }
    }
    Ok(installs)
}
