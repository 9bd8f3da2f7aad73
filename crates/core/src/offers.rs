use chrono::{DateTime, Utc};

use crate::domain::offer::{AcceptedOffer, OfferId};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hands out ids from the creation time in milliseconds. When the clock has not
/// advanced past the previous id the next id is `previous + 1`, so ids stay unique
/// and increasing within a session.
#[derive(Clone, Debug, Default)]
pub struct OfferIdGenerator {
    last: Option<i64>,
}

impl OfferIdGenerator {
    /// The id an offer accepted at `now` would get. Nothing is reserved until
    /// [`OfferIdGenerator::commit`].
    pub fn propose(&self, now: DateTime<Utc>) -> OfferId {
        let millis = now.timestamp_millis();
        match self.last {
            Some(last) if millis <= last => OfferId(last + 1),
            _ => OfferId(millis),
        }
    }

    pub fn commit(&mut self, id: OfferId) {
        self.last = Some(self.last.map_or(id.0, |last| last.max(id.0)));
    }
}

/// Accepted offers, newest first. Entries are never edited or removed.
#[derive(Clone, Debug, Default)]
pub struct OfferList {
    offers: Vec<AcceptedOffer>,
}

impl OfferList {
    pub fn prepend(&mut self, offer: AcceptedOffer) {
        self.offers.insert(0, offer);
    }

    pub fn as_slice(&self) -> &[AcceptedOffer] {
        &self.offers
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcceptedOffer> {
        self.offers.iter()
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{OfferIdGenerator, OfferList};
    use crate::domain::offer::{AcceptedOffer, Category, ImageFile, ImagePreview, OfferId};

    fn offer(id: i64, name: &str) -> AcceptedOffer {
        AcceptedOffer {
            id: OfferId(id),
            name: name.to_string(),
            product_id: format!("P-{id}"),
            category: Category::Tshirts,
            original_price: Decimal::from(100),
            discount_percent: None,
            offer_price: Decimal::from(100),
            image: ImageFile::new("tee.png", vec![1]),
            image_preview: ImagePreview("data:image/png;base64,AQ==".to_string()),
            created_at: Utc::now(),
        }
    }

    fn take(ids: &mut OfferIdGenerator, at: DateTime<Utc>) -> OfferId {
        let id = ids.propose(at);
        ids.commit(id);
        id
    }

    #[test]
    fn ids_follow_the_clock() {
        let mut ids = OfferIdGenerator::default();
        let at = Utc.timestamp_millis_opt(1_730_000_000_000).single().expect("valid instant");
        assert_eq!(take(&mut ids, at), OfferId(1_730_000_000_000));
        assert_eq!(
            take(&mut ids, at + chrono::Duration::milliseconds(5)),
            OfferId(1_730_000_000_005)
        );
    }

    #[test]
    fn same_millisecond_ids_stay_unique() {
        let mut ids = OfferIdGenerator::default();
        let at = Utc.timestamp_millis_opt(1_730_000_000_000).single().expect("valid instant");
        let first = take(&mut ids, at);
        let second = take(&mut ids, at);
        let third = take(&mut ids, at - chrono::Duration::milliseconds(10));
        assert!(first < second && second < third);
    }

    #[test]
    fn proposed_ids_are_not_reserved_until_committed() {
        let mut ids = OfferIdGenerator::default();
        let at = Utc.timestamp_millis_opt(1_730_000_000_000).single().expect("valid instant");
        assert_eq!(ids.propose(at), OfferId(1_730_000_000_000));
        assert_eq!(ids.propose(at), OfferId(1_730_000_000_000));

        ids.commit(ids.propose(at));
        assert_eq!(ids.propose(at), OfferId(1_730_000_000_001));
    }

    #[test]
    fn list_is_newest_first() {
        let mut list = OfferList::default();
        assert!(list.is_empty());
        list.prepend(offer(1, "A"));
        list.prepend(offer(2, "B"));

        let names: Vec<&str> = list.iter().map(|offer| offer.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[1].id, OfferId(1));
    }
}
