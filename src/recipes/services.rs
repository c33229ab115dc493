use super::{
    dto::CreateRecipeRequest,
    repo,
    repo_types::{Recipe, RecipeDraft, DEFAULT_CATEGORY},
};
use crate::{error::AppError, store::DocumentStore};

/// Case-insensitive substring search over title, ingredients, category and description.
///
/// Scans the full public list, so results keep its newest-first order.
pub async fn search_recipes(store: &dyn DocumentStore, term: &str) -> Result<Vec<Recipe>, AppError> {
    let all = repo::list_public_recipes(store)
        .await
        .map_err(|e| match e {
            AppError::RecipeLoad { source, .. } => {
                AppError::recipe_load("Failed to search recipes")(source)
            }
            other => other,
        })?;
    let needle = term.to_lowercase();
    Ok(all.into_iter().filter(|r| matches_term(r, &needle)).collect())
}

fn matches_term(recipe: &Recipe, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&recipe.title)
        || recipe.ingredients.iter().any(|i| hit(i))
        || hit(&recipe.category)
        || recipe.description.as_deref().is_some_and(hit)
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Normalizes a create request the way the add-recipe form does.
pub fn validate_draft(req: CreateRecipeRequest) -> Result<RecipeDraft, AppError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    let ingredients = clean_lines(req.ingredients);
    if ingredients.is_empty() {
        return Err(AppError::Validation("at least one ingredient is required".into()));
    }
    let instructions = clean_lines(req.instructions);
    if instructions.is_empty() {
        return Err(AppError::Validation("at least one instruction is required".into()));
    }
    let category = req
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    Ok(RecipeDraft {
        title,
        description: req.description.map(|d| d.trim().to_string()),
        ingredients,
        instructions,
        category,
        image_url: req
            .image_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{memory::MemoryStore, testing::FlakyStore};

    fn request(title: &str) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.into(),
            description: None,
            ingredients: vec!["flour".into()],
            instructions: vec!["bake".into()],
            category: None,
            image_url: None,
        }
    }

    async fn seed(store: &MemoryStore) {
        let recipes = [
            ("Stuffed Peppers", vec!["1 red bell pepper", "rice"], "Dinner", None),
            ("Pancakes", vec!["flour", "milk"], "breakfast", Some("Fluffy and light")),
            ("Lentil Soup", vec!["lentils", "black Pepper"], "soup", None),
        ];
        for (title, ingredients, category, description) in recipes {
            let draft = RecipeDraft {
                title: title.into(),
                description: description.map(Into::into),
                ingredients: ingredients.into_iter().map(Into::into).collect(),
                instructions: vec!["cook".into()],
                category: category.into(),
                image_url: None,
            };
            repo::create_recipe(store, &draft, "u1", "Ada").await.unwrap();
        }
    }

    fn titles(rs: &[Recipe]) -> Vec<&str> {
        rs.iter().map(|r| r.title.as_str()).collect()
    }

    #[tokio::test]
    async fn search_matches_ingredient_substrings_in_any_case() {
        let store = MemoryStore::new();
        seed(&store).await;

        let lower = search_recipes(&store, "pepper").await.unwrap();
        let upper = search_recipes(&store, "PEPPER").await.unwrap();
        assert_eq!(titles(&lower), ["Lentil Soup", "Stuffed Peppers"]);
        assert_eq!(lower, upper);
    }

    #[tokio::test]
    async fn search_covers_category_and_description() {
        let store = MemoryStore::new();
        seed(&store).await;

        assert_eq!(titles(&search_recipes(&store, "dinner").await.unwrap()), ["Stuffed Peppers"]);
        assert_eq!(titles(&search_recipes(&store, "fluffy").await.unwrap()), ["Pancakes"]);
        assert!(search_recipes(&store, "tofu").await.unwrap().is_empty());
        assert_eq!(search_recipes(&store, "").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn search_failure_has_its_own_message() {
        let store = FlakyStore::failing();
        let err = search_recipes(&store, "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to search recipes");
    }

    #[test]
    fn validate_trims_and_drops_blank_lines() {
        let mut req = request("  Bread  ");
        req.ingredients = vec![" flour ".into(), "   ".into(), "water".into()];
        req.instructions = vec!["".into(), " knead ".into()];
        req.description = Some("  crusty ".into());
        req.category = Some("   ".into());

        let draft = validate_draft(req).unwrap();
        assert_eq!(draft.title, "Bread");
        assert_eq!(draft.ingredients, ["flour", "water"]);
        assert_eq!(draft.instructions, ["knead"]);
        assert_eq!(draft.description.as_deref(), Some("crusty"));
        assert_eq!(draft.category, "other");
    }

    #[test]
    fn validate_rejects_missing_content() {
        assert!(matches!(
            validate_draft(request("   ")),
            Err(AppError::Validation(_))
        ));

        let mut req = request("Bread");
        req.ingredients = vec!["  ".into()];
        assert!(validate_draft(req).is_err());

        let mut req = request("Bread");
        req.instructions.clear();
        assert!(validate_draft(req).is_err());
    }

    #[test]
    fn validate_keeps_category_case() {
        let mut req = request("Bread");
        req.category = Some(" Baking ".into());
        assert_eq!(validate_draft(req).unwrap().category, "Baking");
    }
}
