//! XrdHTTP data channel against the MGM.
//!
//! The MGM answers bulk I/O with redirects to an FST, so redirects are
//! followed explicitly here rather than by the HTTP client: retries must
//! reach the same FST instead of bouncing back to the MGM. Redirects are
//! method-gated: GET follows 302 and 307, PUT follows 307 only, HEAD never
//! redirects. The operation-wide `op_timeout_s` is the hard deadline for
//! the whole redirect/retry dance; `max_redirects`/`max_retries` bound the
//! loop as a safety net below it.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::{Method, Response, StatusCode, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::identity::UnixIdentity;
use crate::options::HttpOptions;

/// HTTP client for the MGM's XrdHTTP interface.
#[derive(Debug, Clone)]
pub struct XrdHttpClient {
    opt: HttpOptions,
    base: Url,
    cl: reqwest::Client,
}

impl XrdHttpClient {
    pub fn new(mut opt: HttpOptions) -> Result<Self, ClientError> {
        opt.apply_defaults();
        let base = Url::parse(&opt.base_url).map_err(|e| {
            ClientError::InvalidInput(format!("invalid base_url '{}': {e}", opt.base_url))
        })?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(opt.connect_timeout_s))
            .pool_idle_timeout(Duration::from_secs(opt.idle_conn_timeout_s))
            .pool_max_idle_per_host(opt.max_idle_conns_per_host);

        if !opt.client_cert_file.is_empty() && !opt.client_key_file.is_empty() {
            let mut pem = std::fs::read(&opt.client_cert_file)?;
            pem.extend_from_slice(&std::fs::read(&opt.client_key_file)?);
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                ClientError::InvalidInput(format!("client certificate: {e}"))
            })?;
            builder = builder.identity(identity);
        }
        for cert in load_ca_material(&opt)? {
            builder = builder.add_root_certificate(cert);
        }

        let cl = builder.build()?;
        Ok(Self { opt, base, cl })
    }

    /// Build the final URL for `urlpath`, appending the resolved identity as
    /// `eos.ruid`/`eos.rgid` query parameters. Paths that already try to
    /// smuggle an identity in are rejected before any network I/O.
    fn build_url(&self, urlpath: &str, identity: UnixIdentity) -> Result<Url, ClientError> {
        reject_identity_injection(urlpath)?;
        let mut url = self.base.join(urlpath).map_err(|e| {
            ClientError::InvalidInput(format!("invalid url path '{urlpath}': {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("eos.ruid", &identity.uid.to_string())
            .append_pair("eos.rgid", &identity.gid.to_string());
        Ok(url)
    }

    /// Download a file. The returned response exposes the FST body as a
    /// stream; the per-attempt timeout keeps running while it is read.
    pub async fn get_file(
        &self,
        remote_user: &str,
        identity: UnixIdentity,
        urlpath: &str,
    ) -> Result<Response, ClientError> {
        info!(remote_user, uid = identity.uid, gid = identity.gid, path = urlpath, "GET file");
        let url = self.build_url(urlpath, identity)?;
        self.with_op_deadline("GET", self.execute(Method::GET, url, None))
            .await
    }

    /// Download a file into `sink`. Returns the number of bytes copied.
    pub async fn get_file_to<W>(
        &self,
        remote_user: &str,
        identity: UnixIdentity,
        urlpath: &str,
        sink: &mut W,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut resp = self.get_file(remote_user, identity, urlpath).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }

    /// Upload a full file. The body is re-attached on every redirect and
    /// `Content-Length` re-set, so the FST always sees the complete stream.
    pub async fn put_file(
        &self,
        remote_user: &str,
        identity: UnixIdentity,
        urlpath: &str,
        content: Bytes,
    ) -> Result<(), ClientError> {
        info!(
            remote_user,
            uid = identity.uid,
            gid = identity.gid,
            path = urlpath,
            length = content.len(),
            "PUT file"
        );
        let url = self.build_url(urlpath, identity)?;
        self.with_op_deadline("PUT", self.execute(Method::PUT, url, Some(content)))
            .await
            .map(|_| ())
    }

    /// Probe a path.
    pub async fn head(
        &self,
        remote_user: &str,
        identity: UnixIdentity,
        urlpath: &str,
    ) -> Result<(), ClientError> {
        info!(remote_user, uid = identity.uid, gid = identity.gid, path = urlpath, "HEAD");
        let url = self.build_url(urlpath, identity)?;
        self.with_op_deadline("HEAD", self.execute(Method::HEAD, url, None))
            .await
            .map(|_| ())
    }

    async fn with_op_deadline<F, T>(&self, what: &str, fut: F) -> Result<T, ClientError>
    where
        F: std::future::Future<Output = Result<T, ClientError>>,
    {
        let op = Duration::from_secs(self.opt.op_timeout_s);
        match tokio::time::timeout(op, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(format!(
                "{what} exceeded the {}s operation deadline",
                self.opt.op_timeout_s
            ))),
        }
    }

    /// One pass of the redirect/retry state machine.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<Response, ClientError> {
        let rw = Duration::from_secs(self.opt.rw_timeout_s);
        let mut current = url;
        let mut redirects = 0u32;
        let mut retries = 0u32;

        loop {
            let mut req = self.cl.request(method.clone(), current.clone()).timeout(rw);
            if let Some(content) = &body {
                req = req
                    .header(CONTENT_LENGTH, content.len())
                    .body(content.clone());
            }

            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    retries += 1;
                    if retries > self.opt.max_retries {
                        return Err(ClientError::Timeout(format!(
                            "retry limit exceeded after {retries} attempts for {current}"
                        )));
                    }
                    warn!(url = %current, retry = retries, error = %err, "recoverable network timeout");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = resp.status();
            if follows_redirect(&method, status) {
                redirects += 1;
                if redirects > self.opt.max_redirects {
                    return Err(ClientError::Transport(format!(
                        "redirect limit exceeded at {current}"
                    )));
                }
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        ClientError::InvalidResponse(format!(
                            "redirect without usable Location from {current}"
                        ))
                    })?;
                current = current.join(location).map_err(|e| {
                    ClientError::InvalidResponse(format!(
                        "redirect to unparseable location '{location}': {e}"
                    ))
                })?;
                debug!(location = %current, redirects, "following redirect");
                continue;
            }

            if status.is_success() {
                return Ok(resp);
            }
            return Err(status_error(resp).await);
        }
    }
}

/// Which redirect statuses each method follows: GET follows 302 and 307,
/// PUT follows 307 only, HEAD never redirects. Anything else falls through
/// to the terminal status mapping.
fn follows_redirect(method: &Method, status: StatusCode) -> bool {
    if *method == Method::GET {
        status == StatusCode::FOUND || status == StatusCode::TEMPORARY_REDIRECT
    } else if *method == Method::PUT {
        status == StatusCode::TEMPORARY_REDIRECT
    } else {
        false
    }
}

/// Map a terminal HTTP status onto the error taxonomy, with the response
/// body as description.
async fn status_error(resp: Response) -> ClientError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let desc = format!("'{}': '{body}'", status.as_u16());
    match status {
        StatusCode::FORBIDDEN => ClientError::PermissionDenied(desc),
        StatusCode::NOT_FOUND => ClientError::NotFound(desc),
        _ => ClientError::Internal(format!("backend error: {desc}")),
    }
}

/// Refuse request paths that already carry an identity as a query
/// parameter. The uid/gid the MGM sees must be the one this client
/// resolved, never caller-supplied text.
fn reject_identity_injection(urlpath: &str) -> Result<(), ClientError> {
    for needle in ["eos.ruid", "eos.guid"] {
        let mut start = 0;
        while let Some(pos) = urlpath[start..].find(needle) {
            let at = start + pos;
            if at > 0 {
                let prev = urlpath.as_bytes()[at - 1];
                if prev == b'&' || prev == b'?' {
                    return Err(ClientError::PermissionDenied(format!(
                        "illegal url path '{urlpath}'"
                    )));
                }
            }
            start = at + needle.len();
        }
    }
    Ok(())
}

/// CA bundles for grid deployments. Files listed explicitly must parse;
/// directories are scanned best-effort since the default path is not
/// present on every host.
fn load_ca_material(opt: &HttpOptions) -> Result<Vec<reqwest::Certificate>, ClientError> {
    let mut certs = Vec::new();

    for file in opt.client_ca_files.split(',').map(str::trim) {
        if file.is_empty() {
            continue;
        }
        let pem = std::fs::read(file)?;
        let parsed = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
            ClientError::InvalidInput(format!("ca bundle '{file}': {e}"))
        })?;
        certs.extend(parsed);
    }

    for dir in opt.client_ca_dirs.split(',').map(str::trim) {
        if dir.is_empty() {
            continue;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir, error = %err, "skipping unreadable ca directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(pem) = std::fs::read(&path) else {
                continue;
            };
            match reqwest::Certificate::from_pem_bundle(&pem) {
                Ok(parsed) => certs.extend(parsed),
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping non-PEM file in ca directory");
                }
            }
        }
    }

    Ok(certs)
}
