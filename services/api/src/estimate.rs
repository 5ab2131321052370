use crate::infra::load_pricing_service;
use clap::{Args, ValueEnum};
use stay_pricing::config::AppConfig;
use stay_pricing::error::AppError;
use stay_pricing::pricing::{
    build_listing_url, CancellationPolicy, ListingInput, MarketId, PropertyType, RoomType,
};

/// Amenities that can be switched on from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum AmenityFlag {
    Balcony,
    Breakfast,
    ChildFriendly,
    Elevator,
    PetsAllowed,
    PrivateEntrance,
    SmokingAllowed,
    Tv,
}

/// Listing attributes; anything omitted keeps the form default.
#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    /// Market to price in (e.g. amsterdam, berlin)
    #[arg(long)]
    pub(crate) market: String,
    /// Zip code as known to the market model (defaults to zip_other)
    #[arg(long)]
    pub(crate) zipcode: Option<String>,
    #[arg(long)]
    pub(crate) accommodates: Option<u32>,
    #[arg(long)]
    pub(crate) bedrooms: Option<f64>,
    #[arg(long)]
    pub(crate) beds: Option<f64>,
    #[arg(long)]
    pub(crate) bathrooms: Option<f64>,
    #[arg(long)]
    pub(crate) minimum_nights: Option<u32>,
    #[arg(long)]
    pub(crate) maximum_nights: Option<u32>,
    /// flexible, moderate, strict or super_strict
    #[arg(long)]
    pub(crate) cancellation_policy: Option<CancellationPolicy>,
    /// Property type label, e.g. "Apartment" or bed_and_breakfast
    #[arg(long)]
    pub(crate) property_type: Option<PropertyType>,
    /// Room type label, e.g. "Entire home/apt" or private_room
    #[arg(long)]
    pub(crate) room_type: Option<RoomType>,
    #[arg(long)]
    pub(crate) instant_bookable: bool,
    #[arg(long)]
    pub(crate) superhost: bool,
    /// Other listings run by the host, bucketed 0-7
    #[arg(long)]
    pub(crate) host_listings: Option<u8>,
    /// Weekly/monthly discount as a fraction (0-0.5)
    #[arg(long)]
    pub(crate) discount: Option<f64>,
    #[arg(long)]
    pub(crate) guests_included: Option<u32>,
    /// Target occupancy as a fraction (0-1)
    #[arg(long)]
    pub(crate) occupancy: Option<f64>,
    /// Switch on an amenity; repeat for several
    #[arg(long = "amenity", value_enum)]
    pub(crate) amenities: Vec<AmenityFlag>,
    /// Mark the listing as lacking essentials
    #[arg(long)]
    pub(crate) no_essentials: bool,
    /// Print the full estimate as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

impl EstimateArgs {
    pub(crate) fn into_input(self) -> ListingInput {
        let mut input = ListingInput::defaults_for(MarketId::new(&self.market));
        if let Some(zipcode) = self.zipcode {
            input.zipcode = zipcode;
        }
        if let Some(value) = self.accommodates {
            input.accommodates = value;
        }
        if let Some(value) = self.bedrooms {
            input.bedrooms = value;
        }
        if let Some(value) = self.beds {
            input.beds = value;
        }
        if let Some(value) = self.bathrooms {
            input.bathrooms = value;
        }
        if let Some(value) = self.minimum_nights {
            input.minimum_nights = value;
        }
        if let Some(value) = self.maximum_nights {
            input.maximum_nights = value;
        }
        if let Some(value) = self.cancellation_policy {
            input.cancellation_policy = value;
        }
        if let Some(value) = self.property_type {
            input.property_type = value;
        }
        if let Some(value) = self.room_type {
            input.room_type = value;
        }
        if let Some(value) = self.host_listings {
            input.host_listing_bucket = value;
        }
        if let Some(value) = self.discount {
            input.weekly_monthly_discount = value;
        }
        if let Some(value) = self.guests_included {
            input.guests_included = value;
        }
        if let Some(value) = self.occupancy {
            input.occupancy_rate = value;
        }
        input.instant_bookable = self.instant_bookable;
        input.host_is_superhost = self.superhost;
        input.amenities.essentials = !self.no_essentials;

        for amenity in self.amenities {
            let flag = match amenity {
                AmenityFlag::Balcony => &mut input.amenities.balcony,
                AmenityFlag::Breakfast => &mut input.amenities.breakfast,
                AmenityFlag::ChildFriendly => &mut input.amenities.child_friendly,
                AmenityFlag::Elevator => &mut input.amenities.elevator,
                AmenityFlag::PetsAllowed => &mut input.amenities.pets_allowed,
                AmenityFlag::PrivateEntrance => &mut input.amenities.private_entrance,
                AmenityFlag::SmokingAllowed => &mut input.amenities.smoking_allowed,
                AmenityFlag::Tv => &mut input.amenities.tv,
            };
            *flag = true;
        }
        input
    }
}

#[derive(Args, Debug)]
pub(crate) struct ListingUrlArgs {
    /// Listing number from the market overview
    pub(crate) listing_no: u64,
}

pub(crate) fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = load_pricing_service(&config.pricing)?;
    let as_json = args.json;
    let input = args.into_input();

    let estimate = service.quote(&input)?;
    if as_json {
        let payload = serde_json::json!({
            "texts": estimate.texts(),
            "estimate": estimate,
        });
        println!("{payload:#}");
        return Ok(());
    }

    let texts = estimate.texts();
    println!("{}", texts.listing_price);
    println!("{}", texts.price_range);
    println!("{}", texts.yearly_earnings);
    Ok(())
}

pub(crate) fn run_markets() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = load_pricing_service(&config.pricing)?;

    println!("Markets ({} loaded)", service.registry().len());
    for summary in service.registry().summaries() {
        println!(
            "- {} ({}): {} listings on {} | {} model | priced at {} rates",
            summary.display_name,
            summary.market,
            summary.total_listings,
            summary.dataset_date,
            summary.model,
            summary.valuation_date
        );
    }
    Ok(())
}

pub(crate) fn run_listing_url(args: ListingUrlArgs) {
    println!("{}", build_listing_url(args.listing_no));
}
