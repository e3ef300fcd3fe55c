//! Detection of the fDMF a package was produced for.
//!
//! The document type is read from the `TYPE` attribute of the main METS root
//! element and the version from the `metadataversion` element of the info
//! file. Elements are matched by local name, so the detection works for both
//! namespaced and plain files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use psp_model::{DmfVersion, DocumentType};
use psp_xml::XmlDocument;

const MAIN_METS_PREFIX: &str = "mets";
const INFO_PREFIX: &str = "info";
const TYPE_ATTRIBUTE: &str = "TYPE";
const VERSION_ELEMENT: &str = "metadataversion";

/// What the package metadata says about its own fDMF. Either part may be
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedDmf {
    pub document_type: Option<DocumentType>,
    pub version: Option<DmfVersion>,
}

impl DetectedDmf {
    /// Reads the main METS and info files in the package root.
    ///
    /// Missing or unreadable files leave the corresponding part undetected.
    pub fn from_package(package_dir: &Path) -> Self {
        let document_type = root_xml_file(package_dir, MAIN_METS_PREFIX)
            .and_then(|mets| load(&mets))
            .and_then(|mets| document_type_of(&mets));
        let version = root_xml_file(package_dir, INFO_PREFIX)
            .and_then(|info| load(&info))
            .and_then(|info| version_of(&info));
        debug!(
            package = %package_dir.display(),
            document_type = ?document_type,
            version = ?version,
            "detected fDMF"
        );
        Self {
            document_type,
            version,
        }
    }
}

/// First `<prefix>_*.xml` file of the package root, by name, ignoring case.
fn root_xml_file(package_dir: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(package_dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().to_ascii_lowercase())
                .is_some_and(|name| {
                    name.starts_with(&format!("{prefix}_")) && name.ends_with(".xml")
                })
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn load(path: &Path) -> Option<XmlDocument> {
    XmlDocument::load(path)
        .map_err(|error| warn!(path = %path.display(), %error, "cannot read package metadata"))
        .ok()
}

fn document_type_of(mets: &XmlDocument) -> Option<DocumentType> {
    let root = mets.root();
    if root.local_name() != "mets" {
        return None;
    }
    let value = &root.attribute(TYPE_ATTRIBUTE)?.value;
    value
        .parse()
        .map_err(|_| warn!(%value, "unrecognized METS document type"))
        .ok()
}

fn version_of(info: &XmlDocument) -> Option<DmfVersion> {
    let root = info.root();
    if root.local_name() != INFO_PREFIX {
        return None;
    }
    let element = root
        .children()
        .find(|child| child.local_name() == VERSION_ELEMENT)?;
    let text = element.direct_text();
    text.trim()
        .parse()
        .map_err(|_| warn!(version = %text.trim(), "unrecognized metadata version"))
        .ok()
}
