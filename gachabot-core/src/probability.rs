// gachabot-core/src/probability.rs
//
// Hit-chance and ranking math. Pure; no I/O, no clocks.

/// How many ranked entries the hot-banner board shows.
pub const RANKING_SIZE: usize = 10;

/// Probability (percent) of pulling at least one of the remaining hits
/// within one day's worth of draws.
///
/// - `stock`: packs left in the banner.
/// - `hits_remaining`: unclaimed prize slots, 0..=3.
/// - `daily_limit`: draws allowed per day; `None` or <= 0 means unlimited.
///
/// Unlimited banners use the plain ratio `hits / stock`. Limited banners
/// draw `k = min(limit, stock)` without replacement, so the chance of at
/// least one hit is the hypergeometric complement
/// `1 - C(stock - hits, k) / C(stock, k)`; when `k > stock - hits` a hit is
/// guaranteed.
pub fn hit_chance(stock: i32, hits_remaining: i32, daily_limit: Option<i32>) -> f64 {
    if stock <= 0 || hits_remaining <= 0 {
        return 0.0;
    }
    let stock = i64::from(stock);
    let hits = i64::from(hits_remaining);

    let k = match daily_limit {
        Some(limit) if limit > 0 => i64::from(limit).min(stock),
        _ => return 100.0 * hits as f64 / stock as f64,
    };

    if k > stock - hits {
        return 100.0;
    }

    // C(stock - hits, k) / C(stock, k) as a running product; the binomials
    // themselves would overflow long before the ratio misbehaves.
    let mut miss = 1.0_f64;
    for i in 0..k {
        miss *= (stock - hits - i) as f64 / (stock - i) as f64;
    }
    100.0 * (1.0 - miss)
}

/// One banner's inputs to the ranking board.
#[derive(Debug, Clone)]
pub struct RankEntry {
    pub pack_id: i64,
    pub category: String,
    pub title: Option<String>,
    pub stock: i32,
    pub hits_remaining: i32,
    pub daily_limit: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RankedBanner {
    pub pack_id: i64,
    pub category: String,
    pub title: Option<String>,
    pub chance: f64,
}

/// Top entries by descending hit chance. Entries in the excluded category,
/// with no stock, or with no hits left never rank.
pub fn rank_banners(entries: &[RankEntry], exclude_category: &str) -> Vec<RankedBanner> {
    let mut ranked: Vec<RankedBanner> = entries
        .iter()
        .filter(|e| e.category != exclude_category && e.stock > 0 && e.hits_remaining > 0)
        .map(|e| RankedBanner {
            pack_id: e.pack_id,
            category: e.category.clone(),
            title: e.title.clone(),
            chance: hit_chance(e.stock, e.hits_remaining, e.daily_limit),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.chance
            .partial_cmp(&a.chance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(RANKING_SIZE);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pack_id: i64, category: &str, stock: i32, hits: i32) -> RankEntry {
        RankEntry {
            pack_id,
            category: category.to_string(),
            title: None,
            stock,
            hits_remaining: hits,
            daily_limit: None,
        }
    }

    #[test]
    fn unlimited_draws_use_plain_ratio() {
        assert_eq!(hit_chance(100, 3, None), 3.0);
        assert_eq!(hit_chance(100, 3, Some(0)), 3.0);
        assert_eq!(hit_chance(100, 3, Some(-1)), 3.0);
    }

    #[test]
    fn empty_or_exhausted_is_zero() {
        assert_eq!(hit_chance(0, 3, None), 0.0);
        assert_eq!(hit_chance(-5, 3, Some(10)), 0.0);
        assert_eq!(hit_chance(100, 0, Some(10)), 0.0);
    }

    #[test]
    fn guaranteed_when_draws_exceed_misses() {
        // k = min(6, 10) = 6 > 10 - 5 = 5
        assert_eq!(hit_chance(10, 5, Some(6)), 100.0);
        assert_eq!(hit_chance(3, 3, Some(1)), 100.0);
    }

    #[test]
    fn hypergeometric_reference_value() {
        // 1 - C(497,10)/C(500,10) = 1 - (490*489*488)/(500*499*498)
        let chance = hit_chance(500, 3, Some(10));
        let expected = 100.0 * (1.0 - 116_929_680.0 / 124_251_000.0);
        assert!((chance - expected).abs() < 1e-9, "got {chance}");
        assert!((chance - 5.8924).abs() < 0.01, "got {chance}");
    }

    #[test]
    fn limit_larger_than_stock_is_clamped() {
        // k = min(50, 10) = 10 drains the banner, so a hit is certain.
        assert_eq!(hit_chance(10, 1, Some(50)), 100.0);
    }

    #[test]
    fn ranking_filters_and_sorts() {
        let entries = vec![
            entry(1, "Pokémon", 100, 3),
            entry(2, "Pokémon", 10, 3),
            entry(3, "Bonus", 2, 3),
            entry(4, "MIX", 100, 0),
            entry(5, "MIX", 0, 3),
        ];
        let ranked = rank_banners(&entries, "Bonus");
        let ids: Vec<i64> = ranked.iter().map(|r| r.pack_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn ranking_caps_at_ten() {
        let entries: Vec<RankEntry> = (0..25).map(|i| entry(i, "MIX", 100 + i as i32, 3)).collect();
        assert_eq!(rank_banners(&entries, "Bonus").len(), RANKING_SIZE);
    }
}
