//! Demo data for development servers.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::info;

use crate::Database;

const CATEGORIES: &[(&str, &str)] = &[
    ("디지털기기", "digital"),
    ("가구/인테리어", "furniture"),
    ("의류", "clothing"),
    ("도서", "books"),
    ("스포츠/레저", "sports"),
    ("뷰티/미용", "beauty"),
    ("생활/가전", "home"),
    ("기타", "etc"),
];

struct SeedUser {
    id: &'static str,
    email: &'static str,
    nickname: &'static str,
    location: &'static str,
    phone_verified: bool,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        id: "user1",
        email: "user1@example.com",
        nickname: "김성수",
        location: "성수동",
        phone_verified: true,
    },
    SeedUser {
        id: "user2",
        email: "user2@example.com",
        nickname: "박뚝섬",
        location: "뚝섬동",
        phone_verified: true,
    },
    SeedUser {
        id: "user3",
        email: "user3@example.com",
        nickname: "이서울숲",
        location: "서울숲",
        phone_verified: false,
    },
];

struct SeedItem {
    seller: &'static str,
    title: &'static str,
    description: &'static str,
    price: i64,
    category: &'static str,
    region: &'static str,
    image: &'static str,
}

const IMG: &str = "https://images.unsplash.com/photo-";

const ITEMS: &[SeedItem] = &[
    SeedItem {
        seller: "user1",
        title: "Apple 맥북 프로 M2 13인치 512GB",
        description: "맥북 프로 M2 13인치 512GB 모델입니다. 사용기간 6개월 정도이고 상태 매우 좋습니다.",
        price: 1_200_000,
        category: "digital",
        region: "성수동",
        image: "1517336714731-489689fd1ca4",
    },
    SeedItem {
        seller: "user2",
        title: "아이폰 14 프로 256GB 딥퍼플",
        description: "아이폰 14 프로 256GB 딥퍼플 색상입니다. 케이스 끼고 사용해서 스크래치 없어요.",
        price: 950_000,
        category: "digital",
        region: "뚝섬동",
        image: "1592750475338-74b7b21085ab",
    },
    SeedItem {
        seller: "user1",
        title: "허만밀러 의자 새제품",
        description: "허만밀러 에어론 의자 새제품입니다. 포장도 안뜯었어요.",
        price: 450_000,
        category: "furniture",
        region: "성수동",
        image: "1541558869434-2840d308329a",
    },
    SeedItem {
        seller: "user3",
        title: "IT 도서 모음 판매",
        description: "개발 관련 도서들 모음으로 판매합니다. 총 15권 정도.",
        price: 50_000,
        category: "books",
        region: "서울숲",
        image: "1481627834876-b7833e8f5570",
    },
    SeedItem {
        seller: "user2",
        title: "나이키 에어맥스 280",
        description: "나이키 에어맥스 280 사이즈입니다. 몇 번 안신어서 거의 새거예요.",
        price: 120_000,
        category: "clothing",
        region: "뚝섬동",
        image: "1549298916-b41d501d3772",
    },
    SeedItem {
        seller: "user1",
        title: "캐논 EOS R5 풀세트",
        description: "캐논 EOS R5 바디와 24-70mm 렌즈 풀세트입니다.",
        price: 2_800_000,
        category: "digital",
        region: "성수동",
        image: "1606983340126-99ab4feaa64a",
    },
    SeedItem {
        seller: "user3",
        title: "삼성 갤럭시 S23 울트라",
        description: "삼성 갤럭시 S23 울트라 512GB 모델입니다.",
        price: 890_000,
        category: "digital",
        region: "서울숲",
        image: "1610945265064-0e34e5519bbf",
    },
    SeedItem {
        seller: "user2",
        title: "다이슨 청소기 V15",
        description: "다이슨 무선청소기 V15 모델입니다. 1년 사용했습니다.",
        price: 350_000,
        category: "home",
        region: "뚝섬동",
        image: "1558618666-fcd25c85cd64",
    },
    SeedItem {
        seller: "user1",
        title: "로지텍 MX 마스터 3S",
        description: "로지텍 MX 마스터 3S 무선 마우스입니다.",
        price: 89_000,
        category: "digital",
        region: "성수동",
        image: "1527864550417-7fd91fc51a46",
    },
    SeedItem {
        seller: "user3",
        title: "이케아 책상 BEKANT",
        description: "이케아 BEKANT 책상 화이트색상입니다. 조립완료 상태.",
        price: 65_000,
        category: "furniture",
        region: "서울숲",
        image: "1586023492125-27b2c045efd7",
    },
    SeedItem {
        seller: "user2",
        title: "아디다스 운동화 새제품",
        description: "아디다스 운동화 새제품입니다. 선물받았는데 사이즈가 안맞아요.",
        price: 95_000,
        category: "clothing",
        region: "뚝섬동",
        image: "1542291026-7eec264c27ff",
    },
    SeedItem {
        seller: "user1",
        title: "프라다 가방 정품",
        description: "프라다 사피아노 토트백 정품입니다. 구매증빙 있어요.",
        price: 1_500_000,
        category: "clothing",
        region: "성수동",
        image: "1584917865442-de89df76afd3",
    },
    SeedItem {
        seller: "user3",
        title: "요가매트 + 요가블록 세트",
        description: "요가매트와 요가블록 세트로 판매합니다. 몇번 안썼어요.",
        price: 35_000,
        category: "sports",
        region: "서울숲",
        image: "1544367567-0f2fcb009e0b",
    },
    SeedItem {
        seller: "user2",
        title: "LG 모니터 27인치 4K",
        description: "LG 27인치 4K 모니터입니다. USB-C 지원해요.",
        price: 420_000,
        category: "digital",
        region: "뚝섬동",
        image: "1527443224154-c4a3942d3acf",
    },
    SeedItem {
        seller: "user1",
        title: "소니 노이즈캔슬링 헤드폰",
        description: "소니 WH-1000XM5 노이즈캔슬링 헤드폰입니다.",
        price: 280_000,
        category: "digital",
        region: "성수동",
        image: "1484704849700-f032a568e944",
    },
    SeedItem {
        seller: "user3",
        title: "무인양품 수납함 세트",
        description: "무인양품 폴리프로필렌 수납함 여러개 세트로 판매해요.",
        price: 85_000,
        category: "home",
        region: "서울숲",
        image: "1558618666-fcd25c85cd64",
    },
    SeedItem {
        seller: "user2",
        title: "아이패드 에어 5세대",
        description: "아이패드 에어 5세대 64GB 모델입니다. 애플펜슬 포함.",
        price: 650_000,
        category: "digital",
        region: "뚝섬동",
        image: "1544244015-0df4b3ffc6b0",
    },
    SeedItem {
        seller: "user1",
        title: "조던 1 하이 시카고",
        description: "에어조던 1 하이 시카고 색상입니다. 사이즈 270.",
        price: 180_000,
        category: "clothing",
        region: "성수동",
        image: "1460353581641-37baddab0fa2",
    },
    SeedItem {
        seller: "user3",
        title: "닌텐도 스위치 OLED",
        description: "닌텐도 스위치 OLED 모델입니다. 게임 몇개 포함해서 드려요.",
        price: 320_000,
        category: "digital",
        region: "서울숲",
        image: "1606144042614-b2417e99c4e3",
    },
    SeedItem {
        seller: "user2",
        title: "바디프랜드 안마의자",
        description: "바디프랜드 안마의자입니다. 이사가서 급매로 내놓아요.",
        price: 1_200_000,
        category: "home",
        region: "뚝섬동",
        image: "1586023492125-27b2c045efd7",
    },
];

impl Database {
    /// Inserts demo categories, users and listings. Safe to call repeatedly:
    /// existing categories and users are left alone and listings are only
    /// added to an empty table.
    pub fn seed(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            for (name, slug) in CATEGORIES {
                tx.execute(
                    "INSERT INTO categories (name, slug) VALUES (?1, ?2)
                     ON CONFLICT(slug) DO NOTHING",
                    rusqlite::params![name, slug],
                )?;
            }

            for user in USERS {
                tx.execute(
                    "INSERT INTO users (id, email, nickname, location, phone_verified)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT DO NOTHING",
                    rusqlite::params![
                        user.id,
                        user.email,
                        user.nickname,
                        user.location,
                        user.phone_verified,
                    ],
                )?;
            }

            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
            if existing > 0 {
                tx.commit()?;
                info!("Seed skipped listings, {} already present", existing);
                return Ok(());
            }

            let category_ids: HashMap<String, i64> = {
                let mut stmt = tx.prepare("SELECT slug, id FROM categories")?;
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<_, _>>()?
            };

            for item in ITEMS {
                let category_id = category_ids
                    .get(item.category)
                    .with_context(|| format!("seed category '{}' missing", item.category))?;
                let images = serde_json::to_string(&[format!("{IMG}{}", item.image)])?;
                tx.execute(
                    "INSERT INTO items
                        (seller_id, title, description, price, category_id, region_code, images)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        item.seller,
                        item.title,
                        item.description,
                        item.price,
                        category_id,
                        item.region,
                        images,
                    ],
                )?;
            }

            tx.commit()?;
            info!(
                "Seeded {} categories, {} users, {} listings",
                CATEGORIES.len(),
                USERS.len(),
                ITEMS.len()
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::open_temp;
    use dongne_types::api::ItemFilter;

    #[test]
    fn seed_is_idempotent() {
        let (_dir, db) = open_temp();
        db.seed().unwrap();
        db.seed().unwrap();

        assert_eq!(db.list_categories().unwrap().len(), 8);
        let listing = db
            .list_items(&ItemFilter {
                limit: 100,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(listing.len(), 20);

        let user1 = db.get_user("user1").unwrap().unwrap();
        assert_eq!(user1.nickname.as_deref(), Some("김성수"));
        assert!(user1.phone_verified);
        assert!(!db.get_user("user3").unwrap().unwrap().phone_verified);
        assert!(
            listing
                .iter()
                .all(|d| d.item.images.len() == 1 && d.item.images[0].starts_with("https://"))
        );
    }
}
