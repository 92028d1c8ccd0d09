//! Default browser services and extension install redirects.

use crate::config::WalletsConfig;
use url::{form_urlencoded, Url};
use web3_wallets_traits::{Navigator, Notifier, WalletName};

/// Notifier that logs instead of showing toasts
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "web3_wallets::toast", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "web3_wallets::toast", "{message}");
    }
}

/// Navigator for hosts without a browser; navigation is logged and dropped
#[derive(Debug, Default, Clone)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn is_mobile(&self) -> bool {
        false
    }

    fn location_href(&self) -> String {
        String::new()
    }

    fn open(&self, url: &str) {
        tracing::debug!(url, "open ignored");
    }

    fn redirect(&self, url: &str) {
        tracing::debug!(url, "redirect ignored");
    }
}

/// MetaMask in-app browser link for `href`
pub fn metamask_deep_link(config: &WalletsConfig, href: &str) -> String {
    let no_scheme = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
        .unwrap_or(href);
    format!("{}{}", config.metamask_deep_link, no_scheme)
}

/// Phantom in-app browser link for `href`, with the page origin as `ref`
pub fn phantom_deep_link(config: &WalletsConfig, href: &str) -> String {
    let origin = Url::parse(href)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default();
    let encoded: String = form_urlencoded::byte_serialize(href.as_bytes()).collect();
    let encoded_ref: String = form_urlencoded::byte_serialize(origin.as_bytes()).collect();
    format!("{}{}?ref={}", config.phantom_deep_link, encoded, encoded_ref)
}

/// Sends the user where they can get `wallet`: the wallet's in-app browser on
/// mobile, the extension store page on desktop
pub fn redirect_to_install(config: &WalletsConfig, navigator: &dyn Navigator, wallet: WalletName) {
    let mobile = navigator.is_mobile();
    match wallet {
        WalletName::MetaMask if mobile => {
            navigator.redirect(&metamask_deep_link(config, &navigator.location_href()))
        }
        WalletName::MetaMask => navigator.open(&config.metamask_install_url),
        WalletName::Phantom if mobile => {
            navigator.redirect(&phantom_deep_link(config, &navigator.location_href()))
        }
        WalletName::Phantom => navigator.open(&config.phantom_install_url),
        WalletName::WalletConnect => {}
    }
    tracing::info!(%wallet, mobile, "wallet not installed, redirected");
}
