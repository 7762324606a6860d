use super::GRAPH_BASE;
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde_json::Value;
use std::time::Duration;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Document-library prefix carried by configured file paths. The resolved
/// `Documents` drive root already is that library, so the prefix must not
/// appear in drive-relative URLs.
const LIBRARY_PREFIX: &str = "Documentos compartidos/";

/// Graph client over a pooled HTTP connection.
pub struct SharePointClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl SharePointClient {
    /// Build the HTTP client, authenticate and return a ready client.
    pub async fn connect(config: &Config) -> Result<Self> {
        let http_client = build_http_client();
        let access_token = super::acquire_token(&http_client, config).await?;
        Ok(Self {
            http_client,
            access_token,
        })
    }

    /// Resolve a `host:/sites/name` style site reference to its site id.
    pub async fn resolve_site(&self, site_url: &str) -> Result<String> {
        let url = format!("{}/sites/{}", GRAPH_BASE, site_url);
        let site: Value = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to resolve SharePoint site '{}'", site_url))?;

        let site_id = site
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| anyhow!("Site response has no id field"))?
            .to_string();

        info!("Resolved site id: {}", site_id);
        Ok(site_id)
    }

    /// Download a file from the site's document library.
    pub async fn download(&self, site_id: &str, file_path: &str) -> Result<Vec<u8>> {
        let drive_id = self.resolve_drive(site_id).await?;
        let url = format!(
            "{}/sites/{}/drives/{}/root:/{}:/content",
            GRAPH_BASE,
            site_id,
            drive_id,
            encode_path(&drive_relative_path(file_path))
        );

        debug!("Downloading {}", file_path);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to download '{}'", file_path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Download of '{}' failed ({}): {}", file_path, status, body);
        }

        let bytes = response.bytes().await?;
        info!("Downloaded {} ({} bytes)", file_path, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Upload a file into the root of the site's document library.
    pub async fn upload(&self, site_id: &str, filename: &str, content: &[u8]) -> Result<()> {
        let drive_id = self.resolve_drive(site_id).await?;
        let url = format!(
            "{}/sites/{}/drives/{}/root:/{}:/content",
            GRAPH_BASE,
            site_id,
            drive_id,
            encode_path(filename)
        );

        debug!("Uploading {} ({} bytes)", filename, content.len());
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", XLSX_CONTENT_TYPE)
            .body(content.to_vec())
            .send()
            .await
            .with_context(|| format!("Failed to upload '{}'", filename))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Upload of '{}' failed ({}): {}", filename, status, body);
        }

        info!("Uploaded {}", filename);
        Ok(())
    }

    /// Pick the site's document-library drive: the one named `Documents` (or
    /// whose name mentions documents), else the first drive listed.
    async fn resolve_drive(&self, site_id: &str) -> Result<String> {
        let url = format!("{}/sites/{}/drives", GRAPH_BASE, site_id);
        let drives: Value = self
            .get_json(&url)
            .await
            .context("Failed to list site drives")?;

        let empty = Vec::new();
        let entries = drives
            .get("value")
            .and_then(|v| v.as_array())
            .unwrap_or(&empty);

        let preferred = entries.iter().find(|drive| {
            let name = drive.get("name").and_then(|n| n.as_str()).unwrap_or("");
            name == "Documents" || name.to_lowercase().contains("document")
        });

        let drive = preferred.or_else(|| entries.first());
        match drive.and_then(|d| d.get("id")).and_then(|id| id.as_str()) {
            Some(id) => Ok(id.to_string()),
            None => bail!("Site has no usable document drive"),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Graph request failed ({}): {}", status, body);
        }

        Ok(response.json().await?)
    }
}

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .user_agent("radar-cli/1.0")
        .build()
        .expect("Failed to build HTTP client")
}

/// Encode each path segment while keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip the document-library prefix from a configured file path.
fn drive_relative_path(path: &str) -> String {
    path.replace(LIBRARY_PREFIX, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_prefix_is_stripped() {
        assert_eq!(
            drive_relative_path("Documentos compartidos/puntajes.xlsx"),
            "puntajes.xlsx"
        );
        assert_eq!(
            drive_relative_path("Documentos compartidos/sub/archivo.xlsx"),
            "sub/archivo.xlsx"
        );
        // Paths outside the library pass through unchanged.
        assert_eq!(drive_relative_path("otros/archivo.xlsx"), "otros/archivo.xlsx");
    }

    #[test]
    fn test_download_path_for_default_config_paths() {
        let encoded = encode_path(&drive_relative_path(
            "Documentos compartidos/Encuesta sobre brechas digitales en ciberseguridad en PYMEs.xlsx",
        ));
        assert!(!encoded.contains("Documentos"));
        assert_eq!(
            encoded,
            "Encuesta%20sobre%20brechas%20digitales%20en%20ciberseguridad%20en%20PYMEs.xlsx"
        );
    }

    #[test]
    fn test_path_segments_are_encoded_separately() {
        assert_eq!(
            encode_path("sub carpeta/informe 2024.xlsx"),
            "sub%20carpeta/informe%202024.xlsx"
        );
    }
}
