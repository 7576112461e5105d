// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use proptest::prelude::*;

use ko::{handler, HttpRequestMethod, Router};

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9]{1,6}", 1..5)
}

proptest! {
    #[test]
    fn literal_patterns_share_one_trie(
        all_parts in prop::collection::vec(
            prop::collection::vec("[a-c]{1,2}", 1..4),
            1..12,
        )
    ) {
        let patterns: Vec<String> = all_parts
            .iter()
            .map(|parts| format!("/{}", parts.join("/")))
            .collect();
        let mut router = Router::new();
        for pattern in &patterns {
            router.add_route(HttpRequestMethod::Get, pattern, handler(|_| {}));
        }

        for pattern in &patterns {
            let (node, params) = router
                .get_route(HttpRequestMethod::Get, pattern)
                .expect("registered literal pattern must match");
            prop_assert_eq!(node.pattern(), pattern.as_str());
            prop_assert!(params.is_empty());
        }
    }

    #[test]
    fn literal_pattern_rejects_longer_path(parts in segments(), extra in "[a-z]{1,6}") {
        let pattern = format!("/{}", parts.join("/"));
        let mut router = Router::new();
        router.add_route(HttpRequestMethod::Get, &pattern, handler(|_| {}));

        let longer = format!("{}/{}", pattern, extra);
        prop_assert!(router.get_route(HttpRequestMethod::Get, &longer).is_none());
    }

    #[test]
    fn param_binds_any_segment(value in "[a-zA-Z0-9_.-]{1,12}") {
        let mut router = Router::new();
        router.add_route(HttpRequestMethod::Get, "/user/:id/profile", handler(|_| {}));

        let path = format!("/user/{}/profile", value);
        let (_, params) = router
            .get_route(HttpRequestMethod::Get, &path)
            .expect("param route must match");
        prop_assert_eq!(params.get("id"), Some(&value));
    }

    #[test]
    fn wildcard_binds_remaining_segments(parts in segments()) {
        let mut router = Router::new();
        router.add_route(HttpRequestMethod::Get, "/static/*filepath", handler(|_| {}));

        let rest = parts.join("/");
        let path = format!("/static/{}", rest);
        let (node, params) = router
            .get_route(HttpRequestMethod::Get, &path)
            .expect("wildcard route must match");
        prop_assert_eq!(node.pattern(), "/static/*filepath");
        prop_assert_eq!(params.get("filepath"), Some(&rest));
    }
}
