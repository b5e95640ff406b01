//! License selection and installation. The license text is fetched from
//! the `licenses/license-templates` repository; when that fails for any
//! reason a short placeholder is written instead.

use reqwest::{blocking::Client, StatusCode};
use std::{
    fmt::Display,
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const TEMPLATES_URL: &str =
    "https://raw.githubusercontent.com/licenses/license-templates/master/templates";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const LICENSE_FILE: &str = "LICENSE";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum License {
    Mit,
    Apache2,
    Gpl3,
    Lgpl3,
    Bsd2Clause,
    Bsd3Clause,
    Mpl2,
    Agpl3,
    Unlicense,
    Cc0,
    None,
}

impl License {
    pub const ALL: [License; 11] = [
        License::Mit,
        License::Apache2,
        License::Gpl3,
        License::Lgpl3,
        License::Bsd2Clause,
        License::Bsd3Clause,
        License::Mpl2,
        License::Agpl3,
        License::Unlicense,
        License::Cc0,
        License::None,
    ];

    /// Template name in the license repository.
    pub fn key(self) -> &'static str {
        match self {
            License::Mit => "mit",
            License::Apache2 => "apache-2-0",
            License::Gpl3 => "gpl-3-0",
            License::Lgpl3 => "lgpl-3-0",
            License::Bsd2Clause => "bsd-2-clause",
            License::Bsd3Clause => "bsd-3-clause",
            License::Mpl2 => "mpl-2-0",
            License::Agpl3 => "agpl-3-0",
            License::Unlicense => "unlicense",
            License::Cc0 => "cc0-1-0",
            License::None => "none",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            License::Mit => "MIT",
            License::Apache2 => "Apache 2.0",
            License::Gpl3 => "GPL 3.0",
            License::Lgpl3 => "LGPL 3.0",
            License::Bsd2Clause => "BSD 2-Clause",
            License::Bsd3Clause => "BSD 3-Clause",
            License::Mpl2 => "MPL 2.0",
            License::Agpl3 => "AGPL 3.0",
            License::Unlicense => "Unlicense",
            License::Cc0 => "CC0 1.0",
            License::None => "None",
        }
    }
}

impl Display for License {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for License {
    type Err = String;

    /// Accepts either the key (`apache-2-0`) or the display name
    /// (`Apache 2.0`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        License::ALL
            .iter()
            .copied()
            .find(|l| s.eq_ignore_ascii_case(l.key()) || s.eq_ignore_ascii_case(l.name()))
            .ok_or_else(|| format!("Unknown license '{}'", s))
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("{url} returned an empty body")]
    Empty { url: String },
}

/// Where raw license templates come from.
pub trait LicenseSource {
    fn fetch(&self, key: &str) -> Result<String, FetchError>;
}

/// Fetches `<base_url>/<key>.txt` over HTTP(S).
pub struct HttpLicenseSource {
    base_url: String,
    timeout: Duration,
}

impl Default for HttpLicenseSource {
    fn default() -> Self {
        HttpLicenseSource::with_base_url(TEMPLATES_URL)
    }
}

impl HttpLicenseSource {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HttpLicenseSource {
            base_url: base_url.into(),
            timeout: FETCH_TIMEOUT,
        }
    }

    fn client(&self) -> Result<Client, FetchError> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("kicad-init/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)
    }
}

impl LicenseSource for HttpLicenseSource {
    fn fetch(&self, key: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}.txt", self.base_url.trim_end_matches('/'), key);
        debug!("Fetching license template from {}", url);
        let response = self
            .client()?
            .get(&url)
            .send()
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }
        let text = response.text().map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;
        if text.trim().is_empty() {
            return Err(FetchError::Empty { url });
        }
        Ok(text)
    }
}

/// Minimal text used when the template cannot be fetched.
pub fn placeholder_license(key: &str, year: i32, holder: &str) -> String {
    format!(
        "License: {}\n\
        \n\
        Copyright (c) {} {}\n\
        \n\
        All rights reserved.\n\
        \n\
        Please visit https://opensource.org/licenses/ for full license text.\n",
        key, year, holder
    )
}

/// Produces the full license body for `license`. Never fails: fetch
/// errors fall back to [`placeholder_license`].
pub fn license_text(source: &dyn LicenseSource, license: License, year: i32, holder: &str) -> String {
    match source.fetch(license.key()) {
        Ok(template) => template
            .replace("[year]", &year.to_string())
            .replace("[fullname]", holder)
            .replace("[email]", ""),
        Err(err) => {
            warn!("Failed to download license {}: {}", license.key(), err);
            placeholder_license(license.key(), year, holder)
        }
    }
}

/// Files written by [`install`], and the ones that could not be.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

/// Writes `LICENSE` into the project root, the board directory and each
/// of `firmware/`, `3d-print/` and `cad/` that exists. A failed write
/// does not prevent the others. `License::None` writes nothing and does
/// not touch the network.
pub fn install(
    source: &dyn LicenseSource,
    license: License,
    year: i32,
    holder: &str,
    project_root: &Path,
    board_dir: &Path,
) -> InstallReport {
    let mut report = InstallReport::default();
    if license == License::None {
        return report;
    }
    let text = license_text(source, license, year, holder);

    let mut targets = vec![project_root.to_path_buf()];
    targets.extend(
        std::iter::once(board_dir.to_path_buf())
            .chain(
                crate::template::LICENSED_DIRS
                    .iter()
                    .map(|dir| project_root.join(dir)),
            )
            .filter(|dir| dir.is_dir()),
    );

    for dir in targets {
        let file = dir.join(LICENSE_FILE);
        match fs::write(&file, &text) {
            Ok(()) => report.written.push(file),
            Err(err) => {
                warn!("Could not write {}: {}", file.display(), err);
                report.failed.push((file, err));
            }
        }
    }
    info!("License files created: {}", license.name());
    report
}
