//! Keyboard-layout APK assembly on top of the signer.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::config::{
    self, AppConfig, SigningConfig, LAYOUT2_PATH, LAYOUT_PATH, ONE_LAYOUT_APK, PEM_BUNDLE,
    TWO_LAYOUT_APK,
};
use crate::core::error::SignError;
use crate::core::signer::ApkSigner;

/// Builds signed keyboard-layout APKs from preloaded unsigned templates.
///
/// Stateless after construction; safe to share behind an `Arc` across
/// concurrent requests.
#[derive(Debug)]
pub struct ApkBuilder {
    signer: ApkSigner,
    one_layout: Vec<u8>,
    two_layouts: Vec<u8>,
}

impl ApkBuilder {
    pub fn new(signer: ApkSigner, one_layout: Vec<u8>, two_layouts: Vec<u8>) -> Self {
        Self {
            signer,
            one_layout,
            two_layouts,
        }
    }

    /// Load the unsigned APK templates from the resources directory.
    pub fn from_resources(signer: ApkSigner, resources: &Path) -> Result<Self> {
        let one_layout = read_template(&resources.join(ONE_LAYOUT_APK))?;
        let two_layouts = read_template(&resources.join(TWO_LAYOUT_APK))?;
        Ok(Self::new(signer, one_layout, two_layouts))
    }

    /// Build a signed APK carrying the given KCM layout(s).
    pub fn build_apk(&self, layout: &str, layout2: Option<&str>) -> Result<Vec<u8>, SignError> {
        let template = if layout2.is_some() {
            &self.two_layouts
        } else {
            &self.one_layout
        };

        let mut replacements = BTreeMap::new();
        replacements.insert(LAYOUT_PATH.to_owned(), layout.as_bytes().to_vec());
        if let Some(second) = layout2 {
            replacements.insert(LAYOUT2_PATH.to_owned(), second.as_bytes().to_vec());
        }

        self.signer.sign_apk(template, &replacements)
    }
}

fn read_template(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading APK template `{}`", path.display()))
}

/// Wire a builder from the app config: signing identity plus templates out
/// of the resources directory.
pub fn create_builder(config: &AppConfig) -> Result<ApkBuilder> {
    let resources = config::resources_dir();
    let signer = load_signer(&config.signing, &resources)?;
    ApkBuilder::from_resources(signer, &resources)
}

fn load_signer(signing: &SigningConfig, resources: &Path) -> Result<ApkSigner> {
    if let Some(bundle) = &signing.bundle {
        return Ok(ApkSigner::from_pem_file(&resources.join(bundle))?);
    }
    // Probe the combined bundle first, then the cert/key pair.
    let bundle = resources.join(PEM_BUNDLE);
    if bundle.exists() {
        return Ok(ApkSigner::from_pem_file(&bundle)?);
    }
    Ok(ApkSigner::from_pem_files(
        &resources.join(&signing.cert),
        &resources.join(&signing.key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signer::fixtures::{template, SIGNING_PEM};
    use crate::core::signer::MANIFEST_NAME;
    use std::io::{Cursor, Read as _};
    use zip::ZipArchive;

    fn test_builder() -> ApkBuilder {
        let signer = ApkSigner::from_pem(SIGNING_PEM).unwrap();
        let one = template(&[(LAYOUT_PATH, b"type OVERLAY\n")]);
        let two = template(&[
            (LAYOUT_PATH, b"type OVERLAY\n".as_slice()),
            (LAYOUT2_PATH, b"type OVERLAY\n".as_slice()),
        ]);
        ApkBuilder::new(signer, one, two)
    }

    fn read_entry(apk: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(apk)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn should_build_single_layout_apk() {
        let apk = test_builder()
            .build_apk("type OVERLAY\nmap key 58 CTRL_LEFT\n", None)
            .unwrap();

        let archive = ZipArchive::new(Cursor::new(apk.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&MANIFEST_NAME));
        assert!(names.contains(&LAYOUT_PATH));
        assert!(!names.contains(&LAYOUT2_PATH));
        drop(archive);

        assert!(read_entry(&apk, LAYOUT_PATH).contains("map key 58 CTRL_LEFT"));
    }

    #[test]
    fn should_build_dual_layout_apk() {
        let apk = test_builder()
            .build_apk(
                "type OVERLAY\nmap key 58 CTRL_LEFT\n",
                Some("type OVERLAY\nmap key 58 ESCAPE\n"),
            )
            .unwrap();

        assert!(read_entry(&apk, LAYOUT_PATH).contains("CTRL_LEFT"));
        assert!(read_entry(&apk, LAYOUT2_PATH).contains("ESCAPE"));
    }

    #[test]
    fn should_fail_cleanly_on_missing_templates() {
        let signer = ApkSigner::from_pem(SIGNING_PEM).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = ApkBuilder::from_resources(signer, dir.path()).unwrap_err();
        assert!(err.to_string().contains("APK template"));
    }
}
