use serde::Serialize;

/// A preset ingredient shown in the picker.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PresetItem {
    pub name: &'static str,
    pub icon: &'static str,
}

/// A display group of preset ingredients.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PresetCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub items: &'static [PresetItem],
}

/// Display metadata attached to a pantry entry. Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub category: String,
    pub icon: String,
}

pub const FALLBACK_CATEGORY: &str = "其他";
pub const FALLBACK_ICON: &str = "🥘";

const fn item(name: &'static str, icon: &'static str) -> PresetItem {
    PresetItem { name, icon }
}

pub const PRESET_CATEGORIES: &[PresetCategory] = &[
    PresetCategory {
        id: "vegetables",
        name: "蔬菜",
        icon: "🥬",
        items: &[
            item("土豆", "🥔"),
            item("西红柿", "🍅"),
            item("白菜", "🥬"),
            item("胡萝卜", "🥕"),
            item("黄瓜", "🥒"),
            item("茄子", "🍆"),
            item("西兰花", "🥦"),
            item("洋葱", "🧅"),
            item("大蒜", "🧄"),
            item("生姜", "🥔"),
            item("辣椒", "🌶️"),
            item("玉米", "🌽"),
            item("蘑菇", "🍄"),
            item("菠菜", "🥬"),
            item("青菜", "🥬"),
        ],
    },
    PresetCategory {
        id: "meat",
        name: "肉禽",
        icon: "🥩",
        items: &[
            item("猪肉", "🐖"),
            item("牛肉", "🐄"),
            item("鸡肉", "🐔"),
            item("鸡翅", "🍗"),
            item("排骨", "🍖"),
            item("羊肉", "🐑"),
            item("培根", "🥓"),
            item("香肠", "🌭"),
            item("鸭肉", "🦆"),
        ],
    },
    PresetCategory {
        id: "seafood",
        name: "海鲜",
        icon: "🦐",
        items: &[
            item("虾", "🦐"),
            item("鱼", "🐟"),
            item("螃蟹", "🦀"),
            item("鱿鱼", "🦑"),
            item("蛤蜊", "🐚"),
            item("龙虾", "🦞"),
        ],
    },
    PresetCategory {
        id: "staples",
        name: "主食",
        icon: "🍚",
        items: &[
            item("米饭", "🍚"),
            item("面条", "🍜"),
            item("馒头", "🥯"),
            item("面包", "🍞"),
            item("饺子", "🥟"),
            item("意大利面", "🍝"),
        ],
    },
    PresetCategory {
        id: "dairy_eggs",
        name: "蛋奶豆腐",
        icon: "🥚",
        items: &[
            item("鸡蛋", "🥚"),
            item("牛奶", "🥛"),
            item("奶酪", "🧀"),
            item("黄油", "🧈"),
            item("豆腐", "🧊"),
        ],
    },
];

/// Look up display metadata for a canonical name.
///
/// Exact, case-sensitive match against the preset table. Synonyms and
/// spelling variants (`番茄` vs `西红柿`) fall back to the generic bucket.
#[must_use]
pub fn enrich(name: &str) -> Enrichment {
    PRESET_CATEGORIES
        .iter()
        .find_map(|cat| {
            cat.items.iter().find(|i| i.name == name).map(|i| Enrichment {
                category: cat.name.to_string(),
                icon: i.icon.to_string(),
            })
        })
        .unwrap_or_else(fallback)
}

#[must_use]
pub fn fallback() -> Enrichment {
    Enrichment {
        category: FALLBACK_CATEGORY.to_string(),
        icon: FALLBACK_ICON.to_string(),
    }
}
