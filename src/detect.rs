//! Connectivity-probe responder.
//!
//! Every major OS decides "is there internet here?" by fetching a known URL
//! and checking either the status, the body, or both. The answers below are
//! chosen so each check fails in the way that makes the OS open its captive
//! sign-in browser pointed at the portal.
//!
//! | Probe | Marker | Answer |
//! |---|---|---|
//! | Android | `generate_204`, `gen_204` | `302` to the portal, empty body |
//! | Windows NCSI | `ncsi` in path, or `NCSI` in User-Agent | `Microsoft NCSI` |
//! | Windows | `connecttest` | `Microsoft Connect Test` |
//! | iOS / macOS | `hotspot-detect` | HTML containing `Success`, redirecting to the portal |
//! | iOS config fetch | `bag` | property list with `CaptiveNetwork = true` |
//! | anything else | | redirect page, forced `302` |

use tracing::{debug, info};

use crate::response::{ContentType, Response};
use crate::status::Status;

/// Path substrings that mark a request as a connectivity probe. Checked in
/// order by the router; any hit hands the request to [`respond`].
pub const PROBE_KEYWORDS: &[&str] = &[
    "generate_204", "gen_204",                // Android
    "ncsi", "connecttest", "redirect",         // Windows
    "hotspot", "bag",                          // iOS
    "success.txt", "canonical",                // other Apple / Firefox probes
    "apple-touch",                             // icon fetches
    "iphonesubmissions", "WebObjects",         // iOS
];

/// Whether `path` contains any of [`PROBE_KEYWORDS`].
pub fn is_probe(path: &str) -> bool {
    PROBE_KEYWORDS.iter().any(|k| path.contains(k))
}

/// Answers a connectivity probe for `path` sent with `user_agent`.
///
/// `path` is the full request target; keywords in the query count.
///
/// `portal_url` is the absolute portal root, e.g. `http://192.168.4.1/`.
pub fn respond(path: &str, user_agent: &str, portal_url: &str) -> Response {
    if !user_agent.is_empty() {
        debug!(user_agent, "probe user agent");
    }

    if path.contains("generate_204") || path.contains("gen_204") {
        info!(path, "android connectivity probe");
        return Response::builder()
            .status(Status::Found)
            .header("location", portal_url)
            .no_body();
    }

    if path.contains("connecttest") || path.contains("ncsi") {
        if user_agent.contains("NCSI") || path.contains("ncsi") {
            info!(path, "windows ncsi probe");
            return Response::text("Microsoft NCSI");
        }
        info!(path, "windows connecttest probe");
        return Response::text("Microsoft Connect Test");
    }

    if path.contains("hotspot-detect") {
        info!(path, "apple hotspot-detect probe");
        return Response::html(redirect_page(portal_url, "Success"));
    }

    if path.contains("bag") {
        info!(path, "apple bag request");
        return Response::builder().bytes(ContentType::Xml, CAPTIVE_PLIST.as_bytes().to_vec());
    }

    info!(path, "other probe, redirecting");
    Response::builder()
        .status(Status::Found)
        .header("location", portal_url)
        .html(redirect_page(portal_url, "<p>Redirecting to network login page...</p>"))
}

const CAPTIVE_PLIST: &str = "\
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">
<plist version=\"1.0\">
<dict>
<key>CaptiveNetwork</key>
<true/>
</dict>
</plist>";

/// HTML page that sends the browser to `url` by meta-refresh and by script.
fn redirect_page(url: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta http-equiv=\"refresh\" content=\"0;url={url}\">\n\
         <script>window.location.href='{url}';</script>\n\
         </head>\n\
         <body>\n\
         {body}\n\
         </body>\n\
         </html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://192.168.4.1/";

    async fn body(res: Response) -> String {
        String::from_utf8(res.into_bytes().await.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn android_gets_empty_redirect() {
        for path in ["/generate_204", "/gen_204"] {
            let res = respond(path, "Dalvik/2.1.0", URL);

            assert_eq!(res.status_code(), 302);
            assert_eq!(res.header("location"), Some(URL));
            assert!(body(res).await.is_empty());
        }
    }

    #[tokio::test]
    async fn windows_ncsi_user_agent() {
        let res = respond("/connecttest.txt", "Microsoft NCSI", URL);

        assert_eq!(res.status_code(), 200);
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(body(res).await, "Microsoft NCSI");
    }

    #[tokio::test]
    async fn windows_ncsi_path() {
        let res = respond("/ncsi.txt", "", URL);

        assert_eq!(body(res).await, "Microsoft NCSI");
    }

    #[tokio::test]
    async fn windows_connecttest_without_ncsi() {
        let res = respond("/connecttest.txt", "Mozilla/5.0", URL);

        assert_eq!(body(res).await, "Microsoft Connect Test");
    }

    #[tokio::test]
    async fn apple_hotspot_detect_says_success_and_redirects() {
        let res = respond("/hotspot-detect.html", "CaptiveNetworkSupport", URL);

        assert_eq!(res.status_code(), 200);
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        let html = body(res).await;
        assert!(html.contains("Success"));
        assert!(html.contains("<meta http-equiv=\"refresh\" content=\"0;url=http://192.168.4.1/\">"));
        assert!(html.contains("window.location.href='http://192.168.4.1/'"));
    }

    #[tokio::test]
    async fn apple_bag_is_captive_plist() {
        let res = respond("/bag", "", URL);

        assert_eq!(res.header("content-type"), Some("text/xml"));
        let xml = body(res).await;
        assert!(xml.contains("<key>CaptiveNetwork</key>\n<true/>"));
    }

    #[tokio::test]
    async fn fallback_is_forced_redirect_with_body() {
        let res = respond("/library/test/success.txt", "", URL);

        assert_eq!(res.status_code(), 302);
        assert_eq!(res.header("location"), Some(URL));
        assert!(body(res).await.contains("Redirecting to network login page"));
    }

    #[test]
    fn keyword_prefilter() {
        assert!(is_probe("/generate_204"));
        assert!(is_probe("/WebObjects/foo"));
        assert!(is_probe("/apple-touch-icon.png"));
        assert!(!is_probe("/webobjects"));
        assert!(!is_probe("/images/logo.png"));
    }
}
