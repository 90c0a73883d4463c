//! Mood maps and social feed analysis.

use city_pulse_report_models::{GENERAL_CATEGORY, UNKNOWN_LOCATION};
use city_pulse_signal_models::{AnalyzedPost, MoodEntry, Sentiment, SocialPost};
use futures::future::join_all;

use crate::area::mood_of;
use crate::capability::SentimentClassifier;

/// Topic keyword table, matched case-insensitively as substrings.
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("Traffic", &["traffic", "congestion", "jam", "road"]),
    ("Weather", &["weather", "rain", "sunny", "hot", "cold"]),
    ("Power", &["power", "electricity", "outage", "cut"]),
    ("Air Quality", &["air", "pollution", "aqi", "smog"]),
    ("Transport", &["metro", "bus", "train", "transport"]),
    ("Food", &["food", "restaurant", "festival", "dining"]),
    ("Infrastructure", &["road", "bridge", "construction"]),
    ("Safety", &["police", "security", "crime"]),
];

/// Topics mentioned in `text`, in table order. Returns `["General"]` when
/// nothing matches.
#[must_use]
pub fn extract_topics(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let topics: Vec<String> = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| (*topic).to_string())
        .collect();

    if topics.is_empty() {
        vec![GENERAL_CATEGORY.to_string()]
    } else {
        topics
    }
}

/// Groups posts by location and classifies each location's combined text.
///
/// Locations appear in first-seen order. Posts without a location are
/// grouped under `"Unknown"`.
pub async fn analyze_sentiment_by_location(
    posts: &[SocialPost],
    classifier: &dyn SentimentClassifier,
) -> Vec<MoodEntry> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for post in posts {
        let location = post
            .location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(UNKNOWN_LOCATION);
        match groups.iter_mut().find(|(l, _)| *l == location) {
            Some((_, texts)) => texts.push(post.text.as_str()),
            None => groups.push((location, vec![post.text.as_str()])),
        }
    }

    let combined: Vec<String> = groups.iter().map(|(_, texts)| texts.join(" ")).collect();
    let sentiments = join_all(combined.iter().map(|text| mood_of(classifier, text))).await;

    groups
        .into_iter()
        .zip(sentiments)
        .map(|((location, texts), sentiment)| MoodEntry {
            location: location.to_string(),
            sentiment,
            emotion: sentiment.emotion(),
            count: texts.len(),
        })
        .collect()
}

/// Classifies every post and tags it with topics.
///
/// A post whose classification fails is returned as neutral, tagged
/// `["General"]`, and marked not analyzed.
pub async fn analyze_social_feed(
    posts: &[SocialPost],
    classifier: &dyn SentimentClassifier,
) -> Vec<AnalyzedPost> {
    let results = join_all(posts.iter().map(|post| classifier.classify(&post.text))).await;

    posts
        .iter()
        .zip(results)
        .map(|(post, result)| match result {
            Ok(sentiment) => AnalyzedPost {
                text: post.text.clone(),
                location: post.location.clone(),
                sentiment,
                topics: extract_topics(&post.text),
                analyzed: true,
            },
            Err(e) => {
                log::debug!("Classification failed for post: {e}");
                AnalyzedPost {
                    text: post.text.clone(),
                    location: post.location.clone(),
                    sentiment: Sentiment::Neutral,
                    topics: vec![GENERAL_CATEGORY.to_string()],
                    analyzed: false,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use city_pulse_signal_models::Emotion;

    use crate::capability::SummarizerError;

    use super::*;

    struct KeywordClassifier;

    #[async_trait::async_trait]
    impl SentimentClassifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<Sentiment, SummarizerError> {
            if text.contains("fail") {
                return Err(SummarizerError::Timeout);
            }
            if text.contains("great") {
                Ok(Sentiment::Positive)
            } else if text.contains("unbearable") {
                Ok(Sentiment::Negative)
            } else {
                Ok(Sentiment::Neutral)
            }
        }
    }

    fn post(text: &str, location: Option<&str>) -> SocialPost {
        SocialPost {
            text: text.to_string(),
            location: location.map(str::to_string),
        }
    }

    #[test]
    fn extracts_every_matching_topic() {
        assert_eq!(
            extract_topics("Traffic jam on the new bridge road"),
            vec!["Traffic", "Infrastructure"]
        );
        assert_eq!(extract_topics("Power CUT again"), vec!["Power"]);
        assert_eq!(extract_topics("hello world"), vec!["General"]);
    }

    #[tokio::test]
    async fn groups_posts_by_location() {
        let posts = vec![
            post("Traffic is unbearable", Some("Delhi")),
            post("great metro", Some("Bengaluru")),
            post("so unbearable", Some("Delhi")),
            post("meh", None),
        ];
        let mood = analyze_sentiment_by_location(&posts, &KeywordClassifier).await;

        assert_eq!(mood.len(), 3);
        assert_eq!(mood[0].location, "Delhi");
        assert_eq!(mood[0].count, 2);
        assert_eq!(mood[0].emotion, Emotion::Frustrated);
        assert_eq!(mood[1].emotion, Emotion::Happy);
        assert_eq!(mood[2].location, "Unknown");
        assert_eq!(mood[2].sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn empty_posts_yield_empty_map() {
        assert!(
            analyze_sentiment_by_location(&[], &KeywordClassifier)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn failed_classification_marks_post_unanalyzed() {
        let posts = vec![
            post("great food festival", Some("Jaipur")),
            post("classifier will fail on this traffic post", None),
        ];
        let analyzed = analyze_social_feed(&posts, &KeywordClassifier).await;

        assert!(analyzed[0].analyzed);
        assert_eq!(analyzed[0].sentiment, Sentiment::Positive);
        assert_eq!(analyzed[0].topics, vec!["Food"]);

        assert!(!analyzed[1].analyzed);
        assert_eq!(analyzed[1].topics, vec!["General"]);
        assert_eq!(analyzed[1].sentiment, Sentiment::Neutral);
    }
}
