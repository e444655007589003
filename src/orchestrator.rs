//! `LinksOrchestrator` (spec §4.6): the top-level engine. Selects tree vs
//! non-tree mode, reads the cache, fans out bounded-parallel scrapes of
//! ancestors/root/target/descendants, feeds results to [`crate::tree`], and
//! writes the result back to cache.
//!
//! Grounded on the teacher's `crawl_engine::orchestrator` concurrency shape
//! (a `Semaphore` gating a `FuturesUnordered`/`join_all` aggregate wait —
//! there, an open-ended BFS frontier; here, a fixed ancestor/root/target/
//! descendant set) but rewritten around this crate's `ScrapeCoordinator` and
//! `TreeAssembler` instead of the dropped BFS crawl loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::cache::{self, CacheLayer};
use crate::config::{CleaningProcessor, LinksOptions};
use crate::fetcher::Fetcher;
use crate::imurl::ImUrl;
use crate::link_extractor::{self, ExtractedLinks};
use crate::metadata::Metadata;
use crate::metrics::MetricsTimer;
use crate::response::{LinksErrorResponse, LinksResponse, LinksSuccessWithTree, LinksSuccessWithoutTree};
use crate::scrape_coordinator::{ScrapeCoordinator, ScrapedData};
use crate::tree::{self, SkippedUrl, Tree, TreeInputs};
use crate::url_classifier;

/// One successfully scraped + extracted page, carried through the fan-out.
struct ScrapedPage {
    url: ImUrl,
    data: ScrapedData,
    extracted: ExtractedLinks,
}

pub struct LinksOrchestrator {
    cache: CacheLayer,
    http_fetcher: Arc<dyn Fetcher>,
    headless_fetcher: Option<Arc<dyn Fetcher>>,
}

impl LinksOrchestrator {
    #[must_use]
    pub fn new(
        cache: CacheLayer,
        http_fetcher: Arc<dyn Fetcher>,
        headless_fetcher: Option<Arc<dyn Fetcher>>,
    ) -> Self {
        Self { cache, http_fetcher, headless_fetcher }
    }

    fn fetcher_for(&self, opts: &LinksOptions) -> Arc<dyn Fetcher> {
        if matches!(opts.cleaning_processor(), CleaningProcessor::Browser) {
            self.headless_fetcher.clone().unwrap_or_else(|| self.http_fetcher.clone())
        } else {
            self.http_fetcher.clone()
        }
    }

    /// `ProcessLinksRequest(ctx, opts) -> LinksSuccessResponse` (spec §4.6).
    pub async fn process_links_request(
        &self,
        opts: LinksOptions,
        cancel: CancellationToken,
    ) -> LinksResponse {
        let request_id = Uuid::new_v4();
        let timer = MetricsTimer::start();

        if !opts.tree() {
            return self.process_non_tree(&opts, request_id, &cancel, &timer).await;
        }

        self.process_tree(&opts, request_id, &cancel, &timer).await
    }

    /// `ProcessNonTree` (spec §4.6).
    async fn process_non_tree(
        &self,
        opts: &LinksOptions,
        request_id: Uuid,
        cancel: &CancellationToken,
        timer: &MetricsTimer,
    ) -> LinksResponse {
        let target_im = opts.url().clone();
        let target: &Url = &target_im;
        let is_platform = url_classifier::is_platform_url(target, opts.is_platform_url_flag());
        let root = url_classifier::derive_root_url(
            target,
            opts.is_platform_url_flag(),
            opts.subdomain_as_root_url(),
        );
        let root_im = ImUrl::parse(root.as_str()).unwrap_or_else(|_| target_im.clone());

        let key = cache::non_tree_key(opts);
        if opts.cache_options().enabled {
            if let Some((mut cached, _side)) =
                self.cache.get_with_metadata::<LinksSuccessWithoutTree>(&key).await
            {
                cached.cached = true;
                cached.timestamp = Utc::now();
                return LinksResponse::Flat(cached);
            }
        }

        let coordinator = ScrapeCoordinator::new(self.fetcher_for(opts));
        let timeout = opts.concurrency().fetch_timeout();

        // Metadata is always extracted for non-tree mode regardless of
        // `opts.metadata`, since `title`/`description` live at the response
        // root (spec §4.6 step 3: "scrape target once (metadata forced on)").
        let mut forced = opts.clone();
        forced.metadata = true;

        let Some(data) =
            coordinator.scrape_if_not_visited(&target_im, &root_im, &forced, timeout, cancel).await
        else {
            let reason = coordinator
                .skipped()
                .get(&target_im)
                .cloned()
                .unwrap_or_else(|| "failed to scrape target".to_string());
            return LinksResponse::Error(LinksErrorResponse {
                request_id,
                success: false,
                target_url: target_im.to_string(),
                timestamp: Utc::now(),
                error: reason,
                tree: None,
            });
        };

        let mut skip_sink: Vec<(String, String)> = Vec::new();
        let extracted = link_extractor::extract_links_from_html(
            &data.raw_html,
            target,
            &root,
            opts.link_extraction_options().include_external,
            opts.link_extraction_options().include_media,
            is_platform,
            &mut skip_sink,
        );

        let skipped_urls = build_skipped_urls(&coordinator, &[skip_sink]);

        let response = LinksSuccessWithoutTree {
            request_id,
            success: true,
            cached: false,
            target_url: target_im.to_string(),
            timestamp: Utc::now(),
            title: data.metadata.as_ref().and_then(|m| m.title.clone()),
            description: data.metadata.as_ref().and_then(|m| m.description.clone()),
            metadata: if opts.metadata() { data.metadata.clone() } else { None },
            cleaned_html: data.cleaned_html.clone(),
            extracted_links: if opts.extracted_links() { Some(extracted) } else { None },
            metrics: if opts.metrics_options().enable { Some(timer.finish()) } else { None },
            skipped_urls: if skipped_urls.is_empty() { None } else { Some(skipped_urls) },
        };

        if opts.cache_options().enabled {
            self.cache.put_with_retry(
                key,
                &response,
                Duration::from_secs(opts.cache_options().expiration_ttl_secs),
            );
        }

        LinksResponse::Flat(response)
    }

    /// The tree pipeline (spec §4.6).
    #[allow(clippy::too_many_lines)]
    async fn process_tree(
        &self,
        opts: &LinksOptions,
        request_id: Uuid,
        cancel: &CancellationToken,
        timer: &MetricsTimer,
    ) -> LinksResponse {
        let target_im = opts.url().clone();
        let target: Url = target_im.as_ref().clone();
        let is_platform = url_classifier::is_platform_url(&target, opts.is_platform_url_flag());
        let root = url_classifier::derive_root_url(
            &target,
            opts.is_platform_url_flag(),
            opts.subdomain_as_root_url(),
        );
        let root_im = ImUrl::parse(root.as_str()).unwrap_or_else(|_| target_im.clone());
        let ancestors = url_classifier::ancestor_paths(&target);

        let tree_key = cache::tree_key(root_im.as_str(), opts);

        let existing_tree: Option<Tree> = if opts.cache_options().enabled {
            self.cache.get_with_metadata::<Tree>(&tree_key).await.map(|(t, _)| t)
        } else {
            None
        };
        let cache_hit = existing_tree.is_some();

        let coordinator = ScrapeCoordinator::new(self.fetcher_for(opts));
        let sem = Semaphore::new(opts.concurrency().max_parallel_fetches.max(1));
        let kin_limit = opts.concurrency().max_kin_limit;

        let target_is_root = target.as_str() == root_im.as_str();

        let (target_result, ancestor_pages, root_branch_pages) = tokio::join!(
            scrape_one(&coordinator, &sem, &target_im, &root_im, opts, is_platform, cancel),
            scrape_ancestors(&coordinator, &sem, &ancestors, &root_im, opts, is_platform, cancel),
            scrape_root_and_descendants(
                &coordinator,
                &sem,
                &target,
                &root_im,
                &ancestors,
                kin_limit,
                opts,
                is_platform,
                cancel,
            ),
        );

        let Some((target_page, target_skips)) = target_result else {
            let reason = coordinator
                .skipped()
                .get(&target_im)
                .cloned()
                .unwrap_or_else(|| "failed to scrape target".to_string());
            return LinksResponse::Error(LinksErrorResponse {
                request_id,
                success: false,
                target_url: target_im.to_string(),
                timestamp: Utc::now(),
                error: reason,
                tree: existing_tree,
            });
        };

        // Step 5: descendants of target, scraped in addition only when
        // target IS the root (otherwise root's own descendant batch above
        // already covers this ground).
        let descendant_pages = if target_is_root {
            let candidates: Vec<Url> =
                target_page.extracted.internal.iter().filter_map(|s| Url::parse(s).ok()).collect();
            let picks: Vec<ImUrl> = url_classifier::descendant_paths(&target, &candidates)
                .into_iter()
                .take(kin_limit)
                .filter_map(|u| ImUrl::parse(u.as_str()).ok())
                .collect();
            scrape_batch(&coordinator, &sem, picks, &root_im, opts, is_platform, cancel).await
        } else {
            Vec::new()
        };

        let mut all_pages: Vec<ScrapedPage> = Vec::new();
        let mut extraction_skips: Vec<Vec<(String, String)>> = vec![target_skips];
        all_pages.push(target_page);
        for (page, skips) in ancestor_pages {
            all_pages.push(page);
            extraction_skips.push(skips);
        }
        for (page, skips) in root_branch_pages {
            all_pages.push(page);
            extraction_skips.push(skips);
        }
        for (page, skips) in descendant_pages {
            all_pages.push(page);
            extraction_skips.push(skips);
        }

        // Union of every internal link discovered by any scraped page.
        let mut seen = std::collections::HashSet::new();
        let internal_links: Vec<ImUrl> = all_pages
            .iter()
            .flat_map(|p| p.extracted.internal.iter())
            .filter(|s| seen.insert((*s).clone()))
            .filter_map(|s| ImUrl::parse(s).ok())
            .collect();

        let visited_timestamps = coordinator.visited_timestamps();

        let mut metadata_by_url: HashMap<ImUrl, Metadata> = HashMap::new();
        let mut cleaned_html_by_url: HashMap<ImUrl, String> = HashMap::new();
        let mut extracted_by_url: HashMap<ImUrl, ExtractedLinks> = HashMap::new();
        for page in &all_pages {
            if let Some(m) = &page.data.metadata {
                metadata_by_url.insert(page.url.clone(), m.clone());
            }
            if let Some(c) = &page.data.cleaned_html {
                cleaned_html_by_url.insert(page.url.clone(), c.clone());
            }
            extracted_by_url.insert(page.url.clone(), page.extracted.clone());
        }

        let skipped_urls = build_skipped_urls(&coordinator, &extraction_skips);

        // Cached tree: metadata participates (it doesn't affect the tree
        // shape key and isn't excluded for size discipline), but
        // cleanedHTML/extractedLinks never persist (spec §4.6 step 8).
        let cache_inputs = TreeInputs {
            metadata_by_url: if opts.metadata() { metadata_by_url.clone() } else { HashMap::new() },
            cleaned_html_by_url: HashMap::new(),
            extracted_by_url: HashMap::new(),
            visited_timestamps: visited_timestamps.clone(),
        };

        let mut cache_tree = match &existing_tree {
            Some(existing) => tree::merge_into_tree(
                existing,
                &internal_links,
                &cache_inputs,
                opts.folder_first(),
                opts.links_order(),
            ),
            None => tree::build_tree(
                &internal_links,
                &root_im,
                &cache_inputs,
                opts.folder_first(),
                opts.links_order(),
            ),
        };
        cache_tree.skipped_urls =
            if skipped_urls.is_empty() { None } else { Some(skipped_urls.clone()) };

        if opts.cache_options().enabled {
            self.cache.put_with_retry(
                tree_key,
                &cache_tree,
                Duration::from_secs(opts.cache_options().expiration_ttl_secs),
            );
        }

        // Second-pass enrichment: cleanedHTML/extractedLinks attached only
        // to the response, never persisted (spec §4.6 step 8).
        let response_tree = if opts.cleaned_html() || opts.extracted_links() {
            let cleaned_map = if opts.cleaned_html() { cleaned_html_by_url } else { HashMap::new() };
            let extracted_map = if opts.extracted_links() { extracted_by_url } else { HashMap::new() };
            let mut touch: Vec<ImUrl> = cleaned_map.keys().cloned().collect();
            touch.extend(extracted_map.keys().cloned());

            let enrich_inputs = TreeInputs {
                metadata_by_url: HashMap::new(),
                cleaned_html_by_url: cleaned_map,
                extracted_by_url: extracted_map,
                visited_timestamps: HashMap::new(),
            };
            let mut enriched = tree::merge_into_tree(
                &cache_tree,
                &touch,
                &enrich_inputs,
                opts.folder_first(),
                opts.links_order(),
            );
            enriched.skipped_urls = cache_tree.skipped_urls.clone();
            enriched
        } else {
            cache_tree.clone()
        };

        LinksResponse::Tree(LinksSuccessWithTree {
            request_id,
            success: true,
            cached: cache_hit,
            target_url: target_im.to_string(),
            timestamp: Utc::now(),
            ancestors: ancestors.iter().map(Url::to_string).collect(),
            skipped_urls: response_tree.skipped_urls.clone(),
            tree: response_tree,
            metrics: if opts.metrics_options().enable { Some(timer.finish()) } else { None },
        })
    }
}

/// Scrapes one URL (bounded by `sem`) and extracts its outgoing links.
/// Returns `None` on fetch failure — never fatal except for the target URL,
/// a decision made by the caller (spec §4.3, §7).
async fn scrape_one(
    coordinator: &ScrapeCoordinator,
    sem: &Semaphore,
    url: &ImUrl,
    root_url: &ImUrl,
    opts: &LinksOptions,
    is_platform: bool,
    cancel: &CancellationToken,
) -> Option<(ScrapedPage, Vec<(String, String)>)> {
    let _permit = sem.acquire().await.ok()?;
    let timeout = opts.concurrency().fetch_timeout();
    let data = coordinator.scrape_if_not_visited(url, root_url, opts, timeout, cancel).await?;

    let mut skip_sink: Vec<(String, String)> = Vec::new();
    let extracted = link_extractor::extract_links_from_html(
        &data.raw_html,
        url,
        root_url,
        opts.link_extraction_options().include_external,
        opts.link_extraction_options().include_media,
        is_platform,
        &mut skip_sink,
    );

    Some((ScrapedPage { url: url.clone(), data, extracted }, skip_sink))
}

async fn scrape_batch(
    coordinator: &ScrapeCoordinator,
    sem: &Semaphore,
    urls: Vec<ImUrl>,
    root_url: &ImUrl,
    opts: &LinksOptions,
    is_platform: bool,
    cancel: &CancellationToken,
) -> Vec<(ScrapedPage, Vec<(String, String)>)> {
    let futures = urls.iter().map(|u| scrape_one(coordinator, sem, u, root_url, opts, is_platform, cancel));
    futures::future::join_all(futures).await.into_iter().flatten().collect()
}

/// Ancestors batch, excluding `rootURL` itself, capped at the kin limit
/// (spec §4.6 step 3, second bullet).
async fn scrape_ancestors(
    coordinator: &ScrapeCoordinator,
    sem: &Semaphore,
    ancestors: &[Url],
    root_url: &ImUrl,
    opts: &LinksOptions,
    is_platform: bool,
    cancel: &CancellationToken,
) -> Vec<(ScrapedPage, Vec<(String, String)>)> {
    let kin_limit = opts.concurrency().max_kin_limit;
    let urls: Vec<ImUrl> = ancestors
        .iter()
        .filter(|a| a.as_str() != root_url.as_str())
        .take(kin_limit)
        .filter_map(|a| ImUrl::parse(a.as_str()).ok())
        .collect();
    scrape_batch(coordinator, sem, urls, root_url, opts, is_platform, cancel).await
}

/// Root (or, in platform mode, `ancestors[1]`) plus up to the kin limit of
/// its own descendants (spec §4.6 step 3, first bullet). A no-op when
/// `target == rootURL`, since step 5 covers that case instead.
#[allow(clippy::too_many_arguments)]
async fn scrape_root_and_descendants(
    coordinator: &ScrapeCoordinator,
    sem: &Semaphore,
    target: &Url,
    root_url: &ImUrl,
    ancestors: &[Url],
    kin_limit: usize,
    opts: &LinksOptions,
    is_platform: bool,
    cancel: &CancellationToken,
) -> Vec<(ScrapedPage, Vec<(String, String)>)> {
    if target.as_str() == root_url.as_str() {
        return Vec::new();
    }

    let primary_url: ImUrl = if is_platform {
        match ancestors.get(1).and_then(|u| ImUrl::parse(u.as_str()).ok()) {
            Some(u) => u,
            None => return Vec::new(),
        }
    } else {
        root_url.clone()
    };

    let Some((page, skips)) =
        scrape_one(coordinator, sem, &primary_url, root_url, opts, is_platform, cancel).await
    else {
        return Vec::new();
    };

    let primary_as_url: Url = primary_url.as_ref().clone();
    let candidates: Vec<Url> = page.extracted.internal.iter().filter_map(|s| Url::parse(s).ok()).collect();
    let descendants: Vec<ImUrl> = url_classifier::descendant_paths(&primary_as_url, &candidates)
        .into_iter()
        .take(kin_limit)
        .filter_map(|u| ImUrl::parse(u.as_str()).ok())
        .collect();

    let mut out = vec![(page, skips)];
    out.extend(scrape_batch(coordinator, sem, descendants, root_url, opts, is_platform, cancel).await);
    out
}

fn build_skipped_urls(
    coordinator: &ScrapeCoordinator,
    extraction_skips: &[Vec<(String, String)>],
) -> Vec<SkippedUrl> {
    let mut out: Vec<SkippedUrl> = coordinator
        .skipped()
        .into_iter()
        .map(|(url, reason)| SkippedUrl { url: url.to_string(), reason })
        .collect();
    for batch in extraction_skips {
        for (href, reason) in batch {
            out.push(SkippedUrl { url: href.clone(), reason: reason.clone() });
        }
    }
    out
}
