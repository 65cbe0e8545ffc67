use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::Error;

const DEFAULT_BODY_PART: &str = "word/document.xml";
const UTF8_BOM: &str = "\u{FEFF}";

struct PackagePart {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: Option<zip::DateTime>,
    is_dir: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Part name inside the archive for internal targets, the raw target otherwise.
    pub target: String,
    pub external: bool,
}

#[derive(Clone, Debug)]
pub struct MediaPart {
    pub part_name: String,
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn parse(xml_content: &str) -> Self {
        let mut types = ContentTypes::default();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            return types;
        };
        for node in xml.root_element().children().filter(|n| n.is_element()) {
            let Some(content_type) = node.attribute("ContentType") else {
                continue;
            };
            match node.tag_name().name() {
                "Default" => {
                    if let Some(ext) = node.attribute("Extension") {
                        types
                            .defaults
                            .insert(ext.to_ascii_lowercase(), content_type.to_string());
                    }
                }
                "Override" => {
                    if let Some(part) = node.attribute("PartName") {
                        types.overrides.insert(
                            part.trim_start_matches('/').to_ascii_lowercase(),
                            content_type.to_string(),
                        );
                    }
                }
                _ => {}
            }
        }
        types
    }

    fn lookup(&self, part_name: &str) -> Option<&str> {
        let lower = part_name.to_ascii_lowercase();
        if let Some(ct) = self.overrides.get(&lower) {
            return Some(ct.as_str());
        }
        let ext = lower.rsplit_once('.').map(|(_, e)| e)?;
        self.defaults.get(ext).map(String::as_str)
    }
}

/// An opened DOCX archive: every part as read, the main document body as
/// editable XML text, and the body's relationship table.
///
/// Parts other than the body are written back with their original contents.
pub struct DocumentPackage {
    parts: Vec<PackagePart>,
    index: HashMap<String, usize>,
    body_part: String,
    body: String,
    body_bom: bool,
    body_modified: bool,
    relationships: HashMap<String, Relationship>,
    content_types: ContentTypes,
}

impl DocumentPackage {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::open_bytes(&data)
    }

    pub fn open_bytes(data: &[u8]) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;
        let parts = read_parts(&mut zip)?;
        let index: HashMap<String, usize> = parts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();

        let mut package = DocumentPackage {
            parts,
            index,
            body_part: String::new(),
            body: String::new(),
            body_bom: false,
            body_modified: false,
            relationships: HashMap::new(),
            content_types: ContentTypes::default(),
        };

        package.content_types = package
            .part_text("[Content_Types].xml")
            .map(ContentTypes::parse)
            .unwrap_or_default();

        package.body_part = package.find_body_part();
        let body_bytes = package.part(&package.body_part).ok_or_else(|| {
            Error::InvalidDocx(format!(
                "missing {} (is this a DOCX file?)",
                package.body_part
            ))
        })?;
        let body = String::from_utf8(body_bytes.to_vec())
            .map_err(|_| Error::InvalidDocx(format!("{} is not UTF-8", package.body_part)))?;
        let (body, body_bom) = match body.strip_prefix(UTF8_BOM) {
            Some(rest) => (rest.to_string(), true),
            None => (body, false),
        };

        {
            let xml = roxmltree::Document::parse(&body)?;
            super::body(&xml)?;
        }
        package.body = body;
        package.relationships = package.parse_body_relationships();

        log::debug!(
            "Opened package: {} parts, body {}, {} relationships",
            package.parts.len(),
            package.body_part,
            package.relationships.len()
        );
        Ok(package)
    }

    pub fn body_part_name(&self) -> &str {
        &self.body_part
    }

    /// The main document XML as it currently stands (without any byte order mark).
    pub fn body_xml(&self) -> &str {
        &self.body
    }

    pub(crate) fn replace_body(&mut self, xml: String) {
        if xml != self.body {
            self.body = xml;
            self.body_modified = true;
        }
    }

    pub fn is_modified(&self) -> bool {
        self.body_modified
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    pub fn media_type(&self, part_name: &str) -> Option<&str> {
        self.content_types.lookup(part_name)
    }

    /// Look up the media part behind a body relationship id. The returned
    /// bytes are a copy; the package keeps its own.
    pub fn resolve(&self, relationship_id: &str) -> Result<MediaPart, Error> {
        let rel = self
            .relationships
            .get(relationship_id)
            .ok_or_else(|| Error::MissingRelationship(relationship_id.to_string()))?;
        if rel.external {
            return Err(Error::MissingRelationship(format!(
                "{relationship_id} (external target {})",
                rel.target
            )));
        }
        let (part_name, data) = self.find_part(&rel.target).ok_or_else(|| {
            Error::MissingRelationship(format!("{relationship_id} -> {} (no such part)", rel.target))
        })?;
        Ok(MediaPart {
            part_name: part_name.to_string(),
            media_type: self.media_type(part_name).map(String::from),
            data: data.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let cursor = self.write_to(Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Write the archive to `path`. The output goes to a temporary file next
    /// to `path` first and replaces it only once fully written, so a failed
    /// save never leaves a truncated document behind. An existing target
    /// keeps its permissions; a new one gets the same mode a plain create
    /// would give it.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut builder = tempfile::Builder::new();
        builder.prefix(".docxide");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Subject to the umask, like `File::create`.
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(dir)?;
        if let Ok(existing) = std::fs::metadata(path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
        self.write_to(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        log::info!("Document saved to: {}", path.display());
        Ok(())
    }

    fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W, Error> {
        let mut zip = zip::ZipWriter::new(sink);
        for part in &self.parts {
            let compression = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = SimpleFileOptions::default().compression_method(compression);
            if let Some(modified) = part.last_modified {
                options = options.last_modified_time(modified);
            }
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)?;
                continue;
            }
            zip.start_file(part.name.as_str(), options)?;
            if part.name == self.body_part {
                if self.body_bom {
                    zip.write_all(UTF8_BOM.as_bytes())?;
                }
                zip.write_all(self.body.as_bytes())?;
            } else {
                zip.write_all(&part.data)?;
            }
        }
        Ok(zip.finish()?)
    }

    fn part(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.parts[i].data.as_slice())
    }

    /// Part names are case-insensitive in OPC; zip entry names are not.
    fn find_part(&self, name: &str) -> Option<(&str, &[u8])> {
        if let Some(&i) = self.index.get(name) {
            let part = &self.parts[i];
            return Some((&part.name, &part.data));
        }
        self.parts
            .iter()
            .find(|p| !p.is_dir && p.name.eq_ignore_ascii_case(name))
            .map(|p| (p.name.as_str(), p.data.as_slice()))
    }

    fn part_text(&self, name: &str) -> Option<&str> {
        self.part(name)
            .and_then(|data| std::str::from_utf8(data).ok())
            .map(|s| s.trim_start_matches(UTF8_BOM))
    }

    fn find_body_part(&self) -> String {
        self.part_text("_rels/.rels")
            .map(|xml| parse_rels_xml(xml, ""))
            .and_then(|rels| {
                rels.into_values()
                    .find(|r| !r.external && r.rel_type.ends_with("/officeDocument"))
            })
            .map(|r| r.target)
            .filter(|target| self.find_part(target).is_some())
            .unwrap_or_else(|| DEFAULT_BODY_PART.to_string())
    }

    /// Relationships of the body part, e.g. "word/document.xml" → "word/_rels/document.xml.rels".
    fn parse_body_relationships(&self) -> HashMap<String, Relationship> {
        let (dir, file) = match self.body_part.rsplit_once('/') {
            Some((d, f)) => (d, f),
            None => ("", self.body_part.as_str()),
        };
        let rels_path = if dir.is_empty() {
            format!("_rels/{}.rels", file)
        } else {
            format!("{}/_rels/{}.rels", dir, file)
        };
        let Some(xml_content) = self.part_text(&rels_path) else {
            log::warn!("No relationship part {rels_path}; images cannot be resolved");
            return HashMap::new();
        };
        parse_rels_xml(xml_content, dir)
    }
}

fn read_parts<R: Read + Seek>(zip: &mut zip::ZipArchive<R>) -> Result<Vec<PackagePart>, Error> {
    let mut parts = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        parts.push(PackagePart {
            name: entry.name().to_string(),
            compression: entry.compression(),
            last_modified: entry.last_modified(),
            is_dir: entry.is_dir(),
            data,
        });
    }
    Ok(parts)
}

fn parse_rels_xml(xml_content: &str, base_dir: &str) -> HashMap<String, Relationship> {
    let mut rels = HashMap::new();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        return rels;
    };
    for node in xml.root_element().children() {
        if node.tag_name().name() == "Relationship"
            && let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target"))
        {
            let external = node.attribute("TargetMode") == Some("External");
            let target = if external {
                target.to_string()
            } else {
                resolve_target(base_dir, target)
            };
            rels.insert(
                id.to_string(),
                Relationship {
                    id: id.to_string(),
                    rel_type: node.attribute("Type").unwrap_or("").to_string(),
                    target,
                    external,
                },
            );
        }
    }
    rels
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{base_dir}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
