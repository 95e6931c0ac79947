//! Download helpers shared by the installers
//!
//! Downloads stream straight to a file in the scratch directory, checking the
//! cancellation token between chunks.

use crate::core::context::InstallContext;
use crate::core::error::{Cause, InstallError, Phase, PhaseExt};
use crate::extract;
use crate::internal::fs_utils;
use crate::internal::progress::{self, ProgressGuard};
use crate::internal::scratch::ScratchDir;
use std::io::{Read, Write};
use std::path::Path;

/// Download `url` to `dest`. Only a `200 OK` counts as success.
///
/// Returns the number of bytes written.
pub fn download(ctx: &InstallContext, url: &str, dest: &Path) -> Result<u64, Cause> {
    ctx.cancel.check()?;
    fs_utils::ensure_parent_dir(dest)?;
    let output = ctx.output();

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(ctx.options.http_timeout)
        .timeout_read(ctx.options.http_timeout)
        .user_agent(&ctx.options.user_agent)
        .build();

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            output.fetched(url, status);
            return Err(Cause::Status {
                url: url.to_string(),
                status,
            });
        }
        Err(ureq::Error::Transport(t)) => {
            return Err(Cause::Transport {
                url: url.to_string(),
                message: t.to_string(),
            });
        }
    };

    output.fetched(url, response.status());
    if response.status() != 200 {
        return Err(Cause::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let filename = filename_from_url(url);
    let guard = ProgressGuard::new(progress::create_spinner(
        &format!("downloading {}", filename),
        ctx.options.quiet,
    ));
    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        progress::upgrade_to_bytes(guard.bar(), len);
    }

    let mut file = std::fs::File::create(dest)
        .map_err(|e| Cause::io(format!("cannot create {}", dest.display()), e))?;

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        ctx.cancel.check()?;
        let bytes_read = reader.read(&mut buffer).map_err(|e| Cause::Transport {
            url: url.to_string(),
            message: format!("read error: {}", e),
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Cause::io(format!("write error for {}", dest.display()), e))?;

        total_bytes += bytes_read as u64;
        guard.bar().set_position(total_bytes);
    }

    file.flush()
        .map_err(|e| Cause::io(format!("write error for {}", dest.display()), e))?;
    output.detail(&format!("downloaded {} ({} bytes)", filename, total_bytes));
    Ok(total_bytes)
}

/// Download a `.tar.gz`, unpack it into the scratch staging tree, then move
/// the tree to `dest`, replacing whatever was there.
pub(crate) fn download_and_extract(
    ctx: &InstallContext,
    scratch: &ScratchDir,
    url: &str,
    dest: &Path,
) -> Result<(), InstallError> {
    let archive = scratch.download_path(&filename_from_url(url));
    download(ctx, url, &archive).phase(Phase::Download)?;

    let work = scratch.work_dir();
    std::fs::create_dir_all(&work)
        .map_err(|e| Cause::io(format!("cannot create directory {}", work.display()), e))
        .phase(Phase::Extract)?;
    let entries = extract::extract_file(&archive, &work, "").phase(Phase::Extract)?;
    ctx.output()
        .detail(&format!("extracted {} entries", entries));

    fs_utils::replace_dir(&work, dest).phase(Phase::Move)
}

/// Last path segment of a URL, without query string or fragment.
pub fn filename_from_url(url: &str) -> String {
    let clean = url.split(['?', '#']).next().unwrap_or(url);
    clean
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "download".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::InstallOptions;
    use tempfile::tempdir;

    fn quiet_ctx() -> InstallContext {
        InstallContext::new(InstallOptions::default().quiet(true))
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://example.com/pkg-1.0.tar.gz"), "pkg-1.0.tar.gz");
        assert_eq!(filename_from_url("https://example.com/a/b.tgz?token=x#frag"), "b.tgz");
        assert_eq!(filename_from_url("https://example.com/"), "download");
        assert_eq!(filename_from_url("https:"), "download");
    }

    #[test]
    fn test_download_unsupported_scheme_is_transport_error() {
        let temp = tempdir().unwrap();
        let err = download(&quiet_ctx(), "file:///etc/hosts", &temp.path().join("f")).unwrap_err();
        assert!(matches!(err, Cause::Transport { .. }));
    }

    #[test]
    fn test_download_cancelled_before_request() {
        let temp = tempdir().unwrap();
        let ctx = quiet_ctx();
        ctx.cancel.cancel();
        let err = download(&ctx, "http://127.0.0.1:9/x", &temp.path().join("f")).unwrap_err();
        assert!(matches!(err, Cause::Cancelled));
    }

    // ==================== Mocked HTTP tests ====================

    mod mock_tests {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_download_writes_body() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/pkg.tar.gz"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
                .mount(&mock_server)
                .await;

            let temp = tempdir().unwrap();
            let dest = temp.path().join("nested/pkg.tar.gz");
            let url = format!("{}/pkg.tar.gz", mock_server.uri());

            let written = download(&quiet_ctx(), &url, &dest).unwrap();

            assert_eq!(written, 13);
            assert_eq!(std::fs::read(&dest).unwrap(), b"archive-bytes");
        }

        #[tokio::test]
        async fn test_download_404_is_status_error() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/missing.tar.gz"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&mock_server)
                .await;

            let temp = tempdir().unwrap();
            let url = format!("{}/missing.tar.gz", mock_server.uri());
            let err = download(&quiet_ctx(), &url, &temp.path().join("m")).unwrap_err();

            assert!(matches!(err, Cause::Status { status: 404, .. }));
        }

        #[tokio::test]
        async fn test_download_non_200_success_rejected() {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/accepted"))
                .respond_with(ResponseTemplate::new(202).set_body_string("later"))
                .mount(&mock_server)
                .await;

            let temp = tempdir().unwrap();
            let url = format!("{}/accepted", mock_server.uri());
            let err = download(&quiet_ctx(), &url, &temp.path().join("a")).unwrap_err();

            assert!(matches!(err, Cause::Status { status: 202, .. }));
        }

        #[tokio::test]
        async fn test_download_and_extract_replaces_destination() {
            use crate::extract::tests::{Entry, tar_gz};

            let mock_server = MockServer::start().await;
            let body = tar_gz(&[
                Entry::Dir("package/"),
                Entry::File("package/main.libsonnet", "{ v: 2 }", 0o644),
            ]);
            Mock::given(method("GET"))
                .and(path("/package.tar.gz"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
                .mount(&mock_server)
                .await;

            let root = tempdir().unwrap();
            let dest = root.path().join("vendor/pkg");
            std::fs::create_dir_all(&dest).unwrap();
            std::fs::write(dest.join("old.libsonnet"), "{}").unwrap();

            let scratch = ScratchDir::create(root.path(), "pkg", "2").unwrap();
            let url = format!("{}/package.tar.gz", mock_server.uri());
            download_and_extract(&quiet_ctx(), &scratch, &url, &dest).unwrap();

            assert_eq!(
                std::fs::read_to_string(dest.join("main.libsonnet")).unwrap(),
                "{ v: 2 }"
            );
            assert!(!dest.join("old.libsonnet").exists());
        }
    }
}
