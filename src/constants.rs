/// Listing defaults
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 12;
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const SLUG_MAX_LEN: usize = 100;

// Image pipeline defaults
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_MIN_INLINE_IMAGE_BYTES: u64 = 50_000;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_INLINE_IMAGES: usize = 5;
pub const DEFAULT_BACKFILL_CONCURRENCY: usize = 4;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Used when neither the country nor the event type has a stock image.
pub const UNIVERSAL_DEFAULT_IMAGE: &str =
    "https://images.unsplash.com/photo-1558618047-3c8c76ca7d13?w=800&h=400&fit=crop&crop=center";

/// Stock imagery per event type, keyed by the type's wire name
pub const TYPE_IMAGES: &[(&str, &str)] = &[
    (
        "TRAINING_CAMP",
        "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=800&h=400&fit=crop&crop=center",
    ),
    (
        "CYCLING_HOLIDAY",
        "https://images.unsplash.com/photo-1558618047-3c8c76ca7d13?w=800&h=400&fit=crop&crop=center",
    ),
    (
        "WEEKEND_GETAWAY",
        "https://images.unsplash.com/photo-1544191696-15693c62e1b4?w=800&h=400&fit=crop&crop=center",
    ),
    (
        "TOUR",
        "https://images.unsplash.com/photo-1517654443271-14c4e7b6a20b?w=800&h=400&fit=crop&crop=center",
    ),
    (
        "EXPEDITION",
        "https://images.unsplash.com/photo-1544266503-7ad532c8e936?w=800&h=400&fit=crop&crop=center",
    ),
];

/// Stock imagery per country
pub const COUNTRY_IMAGES: &[(&str, &str)] = &[
    ("Switzerland", "https://images.unsplash.com/photo-1527095655060-4026c4af2b25?w=800&h=400&fit=crop&crop=center"),
    ("Austria", "https://images.unsplash.com/photo-1551262235-3c533c64e7ab?w=800&h=400&fit=crop&crop=center"),
    ("Italy", "https://images.unsplash.com/photo-1515542622106-78bda8ba0e5b?w=800&h=400&fit=crop&crop=center"),
    ("France", "https://images.unsplash.com/photo-1540270776932-e72e7c2d11cd?w=800&h=400&fit=crop&crop=center"),
    ("Spain", "https://images.unsplash.com/photo-1539037116277-4db20889f2d4?w=800&h=400&fit=crop&crop=center"),
    ("Germany", "https://images.unsplash.com/photo-1467269204594-9661b134dd2b?w=800&h=400&fit=crop&crop=center"),
    ("Netherlands", "https://images.unsplash.com/photo-1534351450181-ea58bf205b9e?w=800&h=400&fit=crop&crop=center"),
    ("Belgium", "https://images.unsplash.com/photo-1577717903315-1691ae25ab3f?w=800&h=400&fit=crop&crop=center"),
    ("Denmark", "https://images.unsplash.com/photo-1568649084754-65fc5c6a8ecb?w=800&h=400&fit=crop&crop=center"),
    ("Norway", "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800&h=400&fit=crop&crop=center"),
    ("Sweden", "https://images.unsplash.com/photo-1509356843151-3e7d96241e11?w=800&h=400&fit=crop&crop=center"),
    ("United Kingdom", "https://images.unsplash.com/photo-1513635269975-59663e0ac1ad?w=800&h=400&fit=crop&crop=center"),
    ("Portugal", "https://images.unsplash.com/photo-1555881400-74d7acaacd8b?w=800&h=400&fit=crop&crop=center"),
    ("Czech Republic", "https://images.unsplash.com/photo-1541849546-216549ae216d?w=800&h=400&fit=crop&crop=center"),
    ("Poland", "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=800&h=400&fit=crop&crop=center"),
    ("Croatia", "https://images.unsplash.com/photo-1555881400-74d7acaacd8b?w=800&h=400&fit=crop&crop=center"),
    ("Slovenia", "https://images.unsplash.com/photo-1578439297738-9ed1b170b5ce?w=800&h=400&fit=crop&crop=center"),
    ("Greece", "https://images.unsplash.com/photo-1533105079780-92b9be482077?w=800&h=400&fit=crop&crop=center"),
];
