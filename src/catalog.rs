/// A storefront section and the product kinds it lists
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub description: &'static str,
    pub items: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "Telegram",
        description: "Звёзды, аккаунты и премиум-подписки",
        items: &["Звёзды", "Аккаунты", "Премиум"],
    },
    Category {
        name: "Steam",
        description: "Пополнение кошелька, аккаунты и подарочные карты",
        items: &["Пополнение Steam", "Аккаунты", "Подарочные карты"],
    },
];

pub fn find(name: &str) -> Option<&'static Category> {
    CATEGORIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Link opened by the "Поддержка" menu entry
pub fn support_link(handle: &str) -> String {
    format!("https://t.me/{}", handle.trim_start_matches('@'))
}
