use rand::Rng;

/// Desktop user agents rotated per page.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
];

/// `Accept-Language` sent with every request.
pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Hides the usual automation tells from page scripts.
pub const STEALTH_INIT_SCRIPT: &str = r"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
    Object.defineProperty(navigator, 'languages', { get: () => ['ru-RU', 'ru', 'en'] });
    window.chrome = { runtime: {} };
";

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration from `rng`.
    pub fn randomized<R: Rng + ?Sized>(rng: &mut R) -> Self {
        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENTS[0].to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}
