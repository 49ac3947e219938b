//! Built-in tag and equipment catalogue, loaded by `recipebox seed`.

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    services::{get_or_create_equipment, get_or_create_tag},
    store::TaxonomyStore,
};
use crate::db::PgStore;

pub const DEFAULT_TAGS: &[&str] = &[
    "Dinner", "Lunch", "Breakfast", "Dessert", "Appetizer", "Snack",
    "Vegan", "Vegetarian", "Gluten-Free", "Dairy-Free", "Keto", "Paleo",
    "Mediterranean", "Quick & Easy", "Healthy", "Comfort Food",
    "Italian", "Mexican", "Asian", "Indian", "French", "American",
    "Seafood", "Chicken", "Beef", "Pork", "Soup", "Salad", "Pasta",
    "Baking", "Grilling", "Slow Cooker", "One-Pot", "Kid-Friendly",
    "Holiday", "Brunch", "Spicy", "Sweet", "Savory", "Low-Carb",
    "High-Protein", "Budget-Friendly", "Make Ahead", "Freezer-Friendly",
    "Weeknight Meal", "Special Occasion", "Side Dish", "Sauce",
    "Marinade", "Smoothie", "Drink", "Casserole", "Stir-Fry", "Roast",
    "Stew", "Curry", "Bread", "Pastry", "Cake", "Cookies", "Pies",
    "Soufflé", "Muffin", "Pancake", "Waffle", "Omelette", "Scramble",
    "Smoothie Bowl", "Sandwich", "Wrap", "Burger", "Pizza", "Taco",
    "Burrito", "Sushi", "Noodles", "Rice", "Quinoa", "Lentils", "Beans",
    "Vegetables", "Fruits", "Herbs", "Spices", "Nuts", "Seeds", "Grains",
    "Dairy", "Eggs", "Meat", "Poultry", "Fish", "Shellfish",
    "Low-Calorie", "High-Fiber", "Sugar-Free", "Nut-Free", "Soy-Free",
    "Pescatarian", "Whole30", "Raw Vegan", "Air Fryer", "Instant Pot",
    "Sheet Pan", "No-Bake", "Fermented", "Sous Vide", "Thai", "Japanese",
    "Chinese", "Vietnamese", "Korean", "Ethiopian", "Middle Eastern",
    "Greek", "Spanish", "German", "Brazilian", "Caribbean", "Cocktail",
    "Mocktail", "Game Day", "Potluck", "Meal Prep", "Freezer Meal",
    "Umami", "Tangy", "Crispy", "Creamy", "Smoky", "Garlicky",
];

pub const DEFAULT_EQUIPMENT: &[&str] = &[
    "Chef's Knife", "Paring Knife", "Bread Knife", "Serrated Knife", "Utility Knife",
    "Cutting Board (Wood)", "Cutting Board (Plastic)", "Mixing Bowls (Set)",
    "Measuring Cups (Dry)", "Measuring Cups (Wet)", "Measuring Spoons",
    "Liquid Measuring Cup", "Whisk (Balloon)", "Whisk (Flat)",
    "Spatula (Silicone)", "Spatula (Metal)", "Wooden Spoon", "Slotted Spoon",
    "Ladle", "Tongs", "Can Opener", "Bottle Opener", "Vegetable Peeler",
    "Grater (Box)", "Microplane", "Colander", "Strainer (Fine Mesh)",
    "Saucepan (Small)", "Saucepan (Medium)", "Saucepan (Large)", "Stock Pot",
    "Frying Pan (Skillet)", "Cast Iron Skillet", "Non-Stick Pan", "Wok",
    "Dutch Oven", "Roasting Pan", "Baking Sheet (Half Sheet)", "Baking Sheet (Quarter Sheet)",
    "Muffin Tin", "Loaf Pan", "Bundt Pan", "Springform Pan", "Pie Dish",
    "Cooling Rack", "Rolling Pin", "Pastry Brush", "Piping Bag & Tips",
    "Kitchen Scale (Digital)", "Meat Thermometer (Instant-Read)", "Oven Thermometer",
    "Timer", "Blender (Countertop)", "Immersion Blender", "Food Processor",
    "Stand Mixer", "Hand Mixer", "Toaster", "Toaster Oven", "Microwave",
    "Coffee Maker (Drip)", "French Press", "Espresso Machine", "Tea Kettle",
    "Slow Cooker", "Pressure Cooker (Stovetop)", "Instant Pot (Electric Pressure Cooker)",
    "Air Fryer", "Rice Cooker", "Electric Griddle", "Waffle Maker",
    "Electric Kettle", "Juicer (Citrus)", "Juicer (Centrifugal)", "Juicer (Masticating)",
    "Grill (Outdoor)", "Grill Pan (Stovetop)", "Smoker", "Mortar and Pestle",
    "Garlic Press", "Citrus Juicer", "Zester", "Kitchen Shears", "Nutcracker",
    "Corkscrew", "Ice Cream Scoop", "Pizza Cutter", "Pizza Stone",
    "Trivet", "Oven Mitts", "Pot Holders", "Dish Towels", "Apron",
    "Food Storage Containers (Set)", "Vacuum Sealer", "Squeeze Bottles",
    "Mandoline Slicer", "Spiralizer", "Salad Spinner", "Potato Masher",
    "Tenderizer (Meat)", "Pastry Blender", "Dough Scraper", "Cookie Cutters (Set)",
    "Sifter (Flour)", "Candy Thermometer", "Deep Fryer", "Chopsticks",
    "Sushi Rolling Mat", "Taco Holder", "Tortilla Press", "Mortar & Pestle (Mexican)",
    "Tagine", "Wok Spatula", "Steamer Basket (Bamboo)", "Steamer Basket (Metal)",
    "Crab Crackers", "Oyster Shucker", "Fish Spatula", "Grill Tongs",
    "Basting Brush (Grill)", "Skewers (Metal)", "Skewers (Bamboo)", "Chimney Starter",
    "Grill Brush", "Pizza Peel", "Bread Lame", "Proofing Basket (Banneton)",
    "Silicone Baking Mat", "Cookie Scoop", "Candy Molds", "Donut Pan",
    "Popover Pan", "Soufflé Dish", "Ramekins", "Canning Jars (Set)",
    "Canning Funnel", "Jar Lifter", "Food Mill", "Pasta Maker (Manual)",
    "Pasta Maker (Electric)", "Gnocchi Board", "Sausage Stuffer", "Meat Grinder",
    "Dehydrator", "Yogurt Maker", "Bread Machine", "Electric Smoker",
    "Sous Vide Cooker (Immersion Circulator)", "Vacuum Sealer Bags",
    "Spice Grinder (Electric)", "Spice Grinder (Manual)", "Herb Scissors",
    "Egg Slicer", "Apple Corer", "Cherry Pitter", "Strawberry Huller",
    "Corn Holders", "Avocado Slicer", "Pineapple Corer", "Melon Baller",
    "Ice Crusher", "Cocktail Shaker", "Jigger", "Muddler", "Bar Spoon",
    "Wine Aerator", "Wine Stopper", "Champagne Stopper", "Beer Growler",
    "Bottle Brush", "Dish Drying Rack", "Knife Sharpener", "Honing Steel",
    "Butcher Block", "Paper Towel Holder", "Pot Rack", "Utensil Holder",
    "Recipe Box/Stand",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

pub async fn load_tags<S>(store: &mut S, names: &[&str]) -> anyhow::Result<SeedReport>
where
    S: TaxonomyStore + ?Sized,
{
    let mut report = SeedReport::default();
    for name in names {
        let (tag, created) = get_or_create_tag(&mut *store, name)
            .await
            .with_context(|| format!("load tag {:?}", name))?;
        if created {
            report.created += 1;
            info!(name = %tag.name, slug = %tag.slug, "tag created");
        } else {
            report.skipped += 1;
            warn!(name = %tag.name, "tag already exists, skipped");
        }
    }
    Ok(report)
}

pub async fn load_equipment<S>(store: &mut S, names: &[&str]) -> anyhow::Result<SeedReport>
where
    S: TaxonomyStore + ?Sized,
{
    let mut report = SeedReport::default();
    for name in names {
        let (equipment, created) = get_or_create_equipment(&mut *store, name)
            .await
            .with_context(|| format!("load equipment {:?}", name))?;
        if created {
            report.created += 1;
            info!(name = %equipment.name, slug = %equipment.slug, "equipment created");
        } else {
            report.skipped += 1;
            warn!(name = %equipment.name, "equipment already exists, skipped");
        }
    }
    Ok(report)
}

/// Loads both default lists in one transaction.
pub async fn run(db: &PgPool) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    let (tags, equipment) = {
        let mut store = PgStore::new(&mut *tx);
        let tags = load_tags(&mut store, DEFAULT_TAGS).await?;
        let equipment = load_equipment(&mut store, DEFAULT_EQUIPMENT).await?;
        (tags, equipment)
    };
    tx.commit().await.context("commit tx")?;

    info!(created = tags.created, skipped = tags.skipped, "finished loading tags");
    info!(
        created = equipment.created,
        skipped = equipment.skipped,
        "finished loading equipment"
    );
    Ok(())
}
