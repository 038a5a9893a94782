//! HTML → PDF through a headless browser
//!
//! The renderer is a trait object so the pipeline can run (and be tested)
//! without a browser installed.

use crate::error::{Error, Result};
use futures_util::future::BoxFuture;

/// Turns an HTML document into PDF bytes
pub trait HtmlRenderer: Send + Sync {
    fn render<'a>(&'a self, html: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Renderer used when no browser backend was compiled in or configured
#[derive(Debug, Default, Clone)]
pub struct UnavailableRenderer;

impl HtmlRenderer for UnavailableRenderer {
    fn render<'a>(&'a self, _html: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async {
            Err(Error::Render {
                reason: "no HTML renderer is available".to_string(),
            })
        })
    }
}

#[cfg(feature = "chromium")]
pub use self::chromium::ChromiumRenderer;

#[cfg(feature = "chromium")]
mod chromium {
    use super::HtmlRenderer;
    use crate::error::{Error, Result};
    use crate::source::TempWorkspace;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
    use futures_util::future::BoxFuture;
    use futures_util::StreamExt;
    use std::path::{Path, PathBuf};

    /// A4 in inches, the unit the DevTools print API takes
    const PAPER_WIDTH_IN: f64 = 8.27;
    const PAPER_HEIGHT_IN: f64 = 11.69;

    fn render_error(context: &str, e: impl std::fmt::Display) -> Error {
        Error::Render {
            reason: format!("{}: {}", context, e),
        }
    }

    /// Launches a fresh headless Chromium per document and prints it to A4
    /// with backgrounds.
    ///
    /// Each launch gets its own profile directory under the workspace, so
    /// concurrent renders never share browser state.
    #[derive(Debug, Clone)]
    pub struct ChromiumRenderer {
        executable: Option<PathBuf>,
        workspace: TempWorkspace,
    }

    impl ChromiumRenderer {
        pub fn new(executable: Option<PathBuf>, workspace: TempWorkspace) -> Self {
            Self {
                executable,
                workspace,
            }
        }

        async fn render_html(&self, html: &str) -> Result<Vec<u8>> {
            let page_file = self.workspace.write("render", "html", html.as_bytes())?;
            let profile = ProfileDir::create(self.workspace.unique_path("chromium-profile", "d"))?;

            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .user_data_dir(profile.path());
            if let Some(executable) = &self.executable {
                builder = builder.chrome_executable(executable);
            }
            let config = builder
                .build()
                .map_err(|e| render_error("invalid browser configuration", e))?;

            tracing::debug!(profile = %profile.path().display(), "launching headless browser");
            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| render_error("failed to launch browser", e))?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let result = print_page(&browser, page_file.path()).await;

            if let Err(e) = browser.close().await {
                tracing::debug!(error = %e, "browser close failed");
            }
            let _ = browser.wait().await;
            handle.abort();

            result
        }
    }

    async fn print_page(browser: &Browser, file: &Path) -> Result<Vec<u8>> {
        let url = format!("file://{}", file.display());
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| render_error("failed to open page", e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| render_error("page failed to load", e))?;

        let params = PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(PAPER_WIDTH_IN),
            paper_height: Some(PAPER_HEIGHT_IN),
            ..Default::default()
        };
        let pdf = page
            .pdf(params)
            .await
            .map_err(|e| render_error("print to PDF failed", e))?;
        let _ = page.close().await;
        Ok(pdf)
    }

    impl HtmlRenderer for ChromiumRenderer {
        fn render<'a>(&'a self, html: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
            Box::pin(self.render_html(html))
        }
    }

    /// Browser profile directory, removed with its contents on drop
    struct ProfileDir {
        path: PathBuf,
    }

    impl ProfileDir {
        fn create(path: PathBuf) -> Result<Self> {
            std::fs::create_dir_all(&path)?;
            Ok(Self { path })
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for ProfileDir {
        fn drop(&mut self) {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove browser profile");
            }
        }
    }

}
