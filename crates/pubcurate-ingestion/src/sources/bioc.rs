//! PMC Open Access BioC client.
//!
//! Endpoint: https://www.ncbi.nlm.nih.gov/research/bionlp/RESTful/pmcoa.cgi/BioC_xml/{pmcid}/unicode
//!
//! Every successful response is written verbatim to `<xml_dir>/<pmcid>.xml`
//! before it is parsed, so the directory doubles as an audit trail.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pubcurate_common::sandbox::SandboxClient as Client;
use pubcurate_common::CurateError;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, instrument, warn};

use crate::models::FetchedDocument;
use super::DocumentFetcher;

pub const BIOC_BASE_URL: &str =
    "https://www.ncbi.nlm.nih.gov/research/bionlp/RESTful/pmcoa.cgi/BioC_xml";
pub const DEFAULT_XML_DIR: &str = "xml_content";

pub struct BioCClient {
    client: Client,
    base_url: String,
    xml_dir: PathBuf,
}

impl BioCClient {
    pub fn new(client: Client, xml_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base_url: BIOC_BASE_URL.to_string(),
            xml_dir: xml_dir.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn xml_path(&self, pmcid: &str) -> PathBuf {
        self.xml_dir.join(format!("{pmcid}.xml"))
    }

    /// Download the raw payload. `Ok(None)` for a non-success status.
    async fn download(&self, pmcid: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let url = format!("{}/{}/unicode", self.base_url.trim_end_matches('/'), pmcid);
        let resp = self.client.get(&url)?.send().await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "BioC returned non-success status");
            return Ok(None);
        }
        Ok(Some(resp.bytes().await?.to_vec()))
    }
}

async fn persist(path: &Path, raw: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, raw).await
}

#[async_trait]
impl DocumentFetcher for BioCClient {
    #[instrument(skip(self))]
    async fn fetch(&self, pmcid: &str) -> Option<FetchedDocument> {
        let raw = match self.download(pmcid).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("BioC request failed: {e}");
                return None;
            }
        };

        let path = self.xml_path(pmcid);
        if let Err(e) = persist(&path, &raw).await {
            warn!(path = %path.display(), "Failed to save BioC payload: {e}");
            return None;
        }
        debug!(path = %path.display(), bytes = raw.len(), "BioC payload saved");

        match parse_passages(&raw) {
            Ok(Some(text)) => Some(FetchedDocument { raw, text }),
            Ok(None) => {
                info!("BioC document has no passage text");
                None
            }
            Err(e) => {
                info!("XML parsing error for PMCID {pmcid}: {e}");
                None
            }
        }
    }
}

/// The `<text>` element currently being read.
struct OpenText {
    depth: usize,
    buf: String,
    // Only character data before the first child element counts.
    direct: bool,
}

/// Join the direct text of every `passage/text` element below the root.
///
/// Returns `Ok(None)` when no passage carries text and an error when the
/// document is not well-formed.
pub fn parse_passages(xml: &[u8]) -> Result<Option<String>, CurateError> {
    let mut reader = Reader::from_reader(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut open: Option<OpenText> = None;
    let mut passages: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut root_closed = false;
    let mut buf = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(CurateError::Xml(format!(
                    "at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(ref e) => {
                if root_closed {
                    return Err(junk_after_root());
                }
                if let Some(ref mut t) = open {
                    t.direct = false;
                }
                let name = e.name().as_ref().to_vec();
                if is_passage_text(&name, &stack) && open.is_none() {
                    open = Some(OpenText { depth: stack.len() + 1, buf: String::new(), direct: true });
                }
                saw_root = true;
                stack.push(name);
            }
            Event::Empty(_) => {
                if root_closed {
                    return Err(junk_after_root());
                }
                if let Some(ref mut t) = open {
                    t.direct = false;
                }
                saw_root = true;
                root_closed = stack.is_empty();
            }
            Event::Text(ref e) => {
                if stack.is_empty() && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(outside_root(saw_root));
                }
                if let Some(ref mut t) = open {
                    if t.direct && t.depth == stack.len() {
                        let text = e.unescape().map_err(|e| CurateError::Xml(e.to_string()))?;
                        t.buf.push_str(&text);
                    }
                }
            }
            Event::CData(ref e) => {
                if stack.is_empty() {
                    return Err(outside_root(saw_root));
                }
                if let Some(ref mut t) = open {
                    if t.direct && t.depth == stack.len() {
                        t.buf.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Event::End(_) => {
                if open.as_ref().is_some_and(|t| t.depth == stack.len()) {
                    if let Some(t) = open.take() {
                        if !t.buf.is_empty() {
                            passages.push(t.buf);
                        }
                    }
                }
                stack.pop();
                root_closed = stack.is_empty();
            }
            Event::Eof => break,
            _ => {}
        }
        drop(event);
        buf.clear();
    }

    if !saw_root {
        return Err(CurateError::Xml("no element found".to_string()));
    }
    if !stack.is_empty() {
        return Err(CurateError::Xml(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(&stack[stack.len() - 1])
        )));
    }

    if passages.is_empty() {
        Ok(None)
    } else {
        Ok(Some(passages.join(" ")))
    }
}

fn junk_after_root() -> CurateError {
    CurateError::Xml("junk after document element".to_string())
}

fn outside_root(saw_root: bool) -> CurateError {
    if saw_root {
        junk_after_root()
    } else {
        CurateError::Xml("syntax error: text before document element".to_string())
    }
}

/// `<text>` directly inside a `<passage>` that is not itself the root.
fn is_passage_text(name: &[u8], stack: &[Vec<u8>]) -> bool {
    name == b"text"
        && stack.len() >= 2
        && stack.last().map(|p| p.as_slice()) == Some(b"passage".as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection>
  <source>PMC</source>
  <document>
    <id>PMC000001</id>
    <passage><infon key="type">title</infon><offset>0</offset><text>NF1 &amp; MPNST</text></passage>
    <passage><offset>12</offset><text></text></passage>
    <passage><offset>13</offset><text>Plexiform neurofibromas.</text></passage>
  </document>
</collection>"#;

    #[test]
    fn test_parse_joins_non_empty_passages() {
        let text = parse_passages(SAMPLE.as_bytes()).unwrap();
        assert_eq!(text.as_deref(), Some("NF1 & MPNST Plexiform neurofibromas."));
    }

    #[test]
    fn test_text_outside_passage_is_ignored() {
        let xml = "<collection><text>stray</text><document><passage><text>kept</text></passage></document></collection>";
        assert_eq!(parse_passages(xml.as_bytes()).unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_only_text_before_first_child_counts() {
        let xml = "<c><passage><text>head<b>bold</b>tail</text></passage></c>";
        assert_eq!(parse_passages(xml.as_bytes()).unwrap().as_deref(), Some("head"));
    }

    #[test]
    fn test_cdata_and_whitespace_are_kept() {
        let xml = "<c><passage><text> a <![CDATA[<b>]]></text></passage></c>";
        assert_eq!(parse_passages(xml.as_bytes()).unwrap().as_deref(), Some(" a <b>"));
    }

    #[test]
    fn test_no_passages_is_none() {
        let xml = "<collection><document><id>1</id></document></collection>";
        assert_eq!(parse_passages(xml.as_bytes()).unwrap(), None);
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_passages(b"<collection><passage><text>x</passage>").is_err());
        assert!(parse_passages(b"<collection><passage><text>x</text>").is_err());
        assert!(parse_passages(b"[Error] : No result can be found.").is_err());
        assert!(parse_passages(b"").is_err());
        assert!(parse_passages(b"<a><passage><text>x</text></passage></a><b/>").is_err());
        assert!(parse_passages(b"<a><passage><text>x</text></passage></a><b></b>").is_err());
        assert!(parse_passages(b"<a><passage><text>x</text></passage></a>trailing junk").is_err());
        assert!(parse_passages(b"<a/><b/>").is_err());
        assert!(parse_passages(b"junk<a><passage><text>x</text></passage></a>").is_err());
    }

    #[test]
    fn test_whitespace_around_root_is_accepted() {
        let xml = "<?xml version=\"1.0\"?>\n<a><passage><text>x</text></passage></a>\n\n";
        assert_eq!(parse_passages(xml.as_bytes()).unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_fetch_saves_payload_and_extracts_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/BioC_xml/PMC000001/unicode")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(SAMPLE)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let xml_dir = dir.path().join("xml_content");
        let fetcher = BioCClient::new(Client::new().unwrap(), &xml_dir)
            .with_base_url(format!("{}/BioC_xml", server.url()));

        let doc = fetcher.fetch("PMC000001").await.unwrap();
        assert_eq!(doc.text, "NF1 & MPNST Plexiform neurofibromas.");
        assert_eq!(std::fs::read(xml_dir.join("PMC000001.xml")).unwrap(), SAMPLE.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_saves_payload_even_when_unparseable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/BioC_xml/PMC2/unicode")
            .with_status(200)
            .with_body("<collection><passage>")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = BioCClient::new(Client::new().unwrap(), dir.path())
            .with_base_url(format!("{}/BioC_xml", server.url()));

        assert!(fetcher.fetch("PMC2").await.is_none());
        assert!(fetcher.xml_path("PMC2").exists());
    }

    fn slow_body(server: &mut Server, path: &str, delay: Duration) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_chunked_body(move |w| {
                std::thread::sleep(delay);
                w.write_all(b"<c><passage><text>ok</text></passage></c>")
            })
    }

    #[tokio::test]
    async fn test_slow_response_is_not_cut_off() {
        let mut server = Server::new_async().await;
        slow_body(&mut server, "/BioC_xml/PMC4/unicode", Duration::from_millis(1500))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = BioCClient::new(Client::new().unwrap(), dir.path())
            .with_base_url(format!("{}/BioC_xml", server.url()));

        let doc = fetcher.fetch("PMC4").await.unwrap();
        assert_eq!(doc.text, "ok");
        assert!(fetcher.xml_path("PMC4").exists());
    }

    #[tokio::test]
    async fn test_opt_in_timeout_drops_slow_response() {
        let mut server = Server::new_async().await;
        slow_body(&mut server, "/BioC_xml/PMC5/unicode", Duration::from_millis(1500))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = Client::new().unwrap().with_timeout(Duration::from_millis(200));
        let fetcher = BioCClient::new(client, dir.path())
            .with_base_url(format!("{}/BioC_xml", server.url()));

        assert!(fetcher.fetch("PMC5").await.is_none());
        assert!(!fetcher.xml_path("PMC5").exists());
    }

    #[tokio::test]
    async fn test_fetch_error_status_writes_nothing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/BioC_xml/PMC3/unicode")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = BioCClient::new(Client::new().unwrap(), dir.path())
            .with_base_url(format!("{}/BioC_xml", server.url()));

        assert!(fetcher.fetch("PMC3").await.is_none());
        assert!(!fetcher.xml_path("PMC3").exists());
    }
}
