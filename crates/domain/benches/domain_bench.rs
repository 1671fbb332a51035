use std::sync::Arc;

use cache::InMemoryCache;
use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{AesGcmEncryptor, CreateOrderInput, CreatePetInput, FieldEncryptor, OrderService};
use ledger::{CatalogStore, InMemoryLedger, Pet, PetId, PetStatus, Species, Store, StoreId};

async fn seeded_ledger(pets: usize) -> (InMemoryLedger, StoreId, Vec<PetId>) {
    let ledger = InMemoryLedger::new();
    let now = Utc::now();
    let store = Store {
        id: StoreId::new(),
        name: "Bench".to_string(),
        owner_id: "bench".to_string(),
        created_at: now,
        updated_at: now,
    };
    ledger.insert_store(&store).await.unwrap();

    let mut ids = Vec::with_capacity(pets);
    for i in 0..pets {
        let pet = Pet {
            id: PetId::new(),
            store_id: store.id,
            name: format!("pet-{i}"),
            species: Species::Dog,
            age: 1,
            picture_url: None,
            description: None,
            breeder_name: "Sam".to_string(),
            breeder_email_encrypted: "sealed".to_string(),
            status: PetStatus::Available,
            created_at: now,
            updated_at: now,
        };
        ledger.insert_pet(&pet).await.unwrap();
        ids.push(pet.id);
    }
    (ledger, store.id, ids)
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    for size in [1, 10] {
        c.bench_function(&format!("domain/create_order_{size}_pets"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let (ledger, store_id, pets) = seeded_ledger(size).await;
                    let service = OrderService::new(ledger, Arc::new(InMemoryCache::new()));
                    service
                        .create_order(CreateOrderInput::new("customer1", store_id, pets))
                        .await
                        .unwrap();
                });
            });
        });
    }
}

fn bench_partial_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_order_half_sold", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (ledger, store_id, pets) = seeded_ledger(10).await;
                let service = OrderService::new(ledger, Arc::new(InMemoryCache::new()));
                service
                    .create_order(CreateOrderInput::new("early", store_id, pets[..5].to_vec()))
                    .await
                    .unwrap();
                let outcome = service
                    .create_order(CreateOrderInput::new("late", store_id, pets))
                    .await
                    .unwrap();
                assert!(outcome.is_partial());
            });
        });
    });
}

fn bench_encryption(c: &mut Criterion) {
    let encryptor = AesGcmEncryptor::new(b"0123456789abcdef0123456789abcdef").unwrap();
    let sealed = encryptor.encrypt("breeder@example.com").unwrap();

    c.bench_function("domain/encrypt_email", |b| {
        b.iter(|| encryptor.encrypt("breeder@example.com").unwrap());
    });
    c.bench_function("domain/decrypt_email", |b| {
        b.iter(|| encryptor.decrypt(&sealed).unwrap());
    });
}

fn bench_validation(c: &mut Criterion) {
    let input = CreatePetInput {
        store_id: StoreId::new(),
        name: "Rex".to_string(),
        species: Species::Dog,
        age: 3,
        picture_url: None,
        description: Some("A very good dog".to_string()),
        breeder_name: "Sam".to_string(),
        breeder_email: "sam@example.com".to_string(),
    };

    c.bench_function("domain/validate_pet", |b| {
        b.iter(|| domain::validation::validate_create_pet(&input).unwrap());
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_partial_order,
    bench_encryption,
    bench_validation
);
criterion_main!(benches);
